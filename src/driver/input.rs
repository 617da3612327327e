//! Simulated user input: typing and pointer moves.

use std::time::Duration;

use crate::dom::Role;
use crate::locator::WaitState;
use crate::page::Page;
use crate::Result;

/// Corners visited by [`move_mouse`], starting and ending at the origin.
pub const MOUSE_PATH: [(f64, f64); 5] = [(0.0, 0.0), (0.0, 100.0), (100.0, 100.0), (100.0, 0.0), (0.0, 0.0)];

/// Type `text` into the field with `test_id` the way a user would: click,
/// fill its textbox, blur, then give the form time to settle.
pub async fn write_text(page: &Page, test_id: &str, text: &str) -> Result<()> {
    let field = page.get_by_test_id(test_id);
    field.click().await?;
    field.wait_for(WaitState::Visible).await?;
    field.get_by_role(Role::Textbox).fill(text).await?;
    field.blur().await?;
    tokio::time::sleep(Duration::from_millis(page.config().settle_delay_ms)).await;
    Ok(())
}

/// Walk the pointer around a 100x100 square.
pub async fn move_mouse(page: &Page) -> Result<()> {
    let config = page.config();
    let pause = Duration::from_millis(config.mouse_total_delay_ms / MOUSE_PATH.len() as u64);
    for (x, y) in MOUSE_PATH {
        page.mouse_move(x, y, config.mouse_steps).await?;
        tokio::time::sleep(pause).await;
    }
    Ok(())
}
