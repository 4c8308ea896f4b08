mod common;

use std::collections::HashSet;

use anyhow::Result;
use futures::future::join_all;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_child_creation_never_duplicates_codes() -> Result<()> {
    let server = common::spawn().await?;
    server.create_he("HE-001", "MATH", "KRO").await?;

    let attempts = (0..12).map(|_| server.create_exmr(&server.admin_token, "HE-001", "MATH"));
    let results = join_all(attempts).await;

    let mut created = HashSet::new();
    for result in results {
        let (status, body) = result?;
        match status {
            StatusCode::CREATED => {
                let code = body["data"]["exmr_code"].as_str().unwrap_or_default().to_string();
                assert!(created.insert(code), "duplicate code issued");
            }
            // Losers of a read-then-insert race
            StatusCode::BAD_REQUEST => assert_eq!(body["error"], "CONFLICT"),
            other => panic!("unexpected status {}: {}", other, body),
        }
    }
    assert!(!created.is_empty());

    let (_, body) = server.get(&server.admin_token, "/api/exmrs/search?he_code=HE-001").await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(created.len()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_parent_creation_has_single_winner() -> Result<()> {
    let server = common::spawn().await?;
    let kro = server.regional_token("kro_user", "KRO").await?;

    let attempts = (0..8).map(|i| {
        server.post(
            &kro,
            "/api/hes/add",
            json!({ "he_code": "HE-001", "name": format!("Racer {}", i), "subject_code": "MATH" }),
        )
    });
    let results = join_all(attempts).await;

    let mut winners = 0;
    for result in results {
        let (status, body) = result?;
        if status == StatusCode::CREATED {
            winners += 1;
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "CONFLICT");
        }
    }
    assert_eq!(winners, 1);
    Ok(())
}
