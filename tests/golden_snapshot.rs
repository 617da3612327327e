mod common;

use std::fs;
use std::path::PathBuf;

use oneharness::driver::{launch_fields, RenderOptions};
use oneharness::schema::{FieldNode, FieldType};
use serde_json::json;

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens");
    p.push(name);
    p
}

#[tokio::test]
async fn text_field_snapshot_matches_golden() {
    let page = common::open_page().await;
    let fields = vec![FieldNode::new(FieldType::Text)
        .name("text")
        .title("Text")
        .test_id("text-field")];
    let options = RenderOptions::default().data(json!({"text": "Hello world"}));
    launch_fields(&page, &fields, &options).await.unwrap();

    let snapshot = page.snapshot().await.unwrap();
    assert_eq!(
        snapshot.outline,
        "root #react-declarative__oneGenesisReady\n  group #text-field \"Text\"\n    textbox [Text] value=\"Hello world\"\n"
    );
    assert_eq!(snapshot.text, "Text");
    assert_eq!(snapshot.url, "http://localhost:3000/?playwrite");

    let expected_path = golden_path("text_field.sha256");
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::write(&expected_path, format!("{}\n", snapshot.digest())).expect("write golden");
        println!("Updated golden: {:?}", expected_path);
        return;
    }
    let expected = fs::read_to_string(&expected_path).expect("unable to read golden");
    assert_eq!(snapshot.digest(), expected.trim());
}

#[tokio::test]
async fn identical_forms_share_a_digest() {
    let fields = vec![
        FieldNode::new(FieldType::Group).test_id("g").with_fields(vec![
            FieldNode::new(FieldType::Checkbox).name("a").title("A"),
            FieldNode::new(FieldType::Button).title("Go"),
        ]),
    ];
    let mut digests = Vec::new();
    for _ in 0..2 {
        let page = common::open_page().await;
        launch_fields(&page, &fields, &RenderOptions::default()).await.unwrap();
        digests.push(page.snapshot().await.unwrap().digest());
        page.close().await.unwrap();
    }
    assert_eq!(digests[0], digests[1]);
}
