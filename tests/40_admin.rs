mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn elevated_routes_require_verified_admin() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let result = json!({ "raceId": "monza-2025", "drivers": ["ver", "nor", "lec", "pia", "sai", "ham"] });

    let res = client.post(server.url("/admin/results")).json(&result).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let fan = common::token("admin-fan", "fan@example.com");
    let res = client
        .post(server.url("/admin/results"))
        .bearer_auth(&fan)
        .header("cookie", "adminVerified=true")
        .json(&result)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let admin = common::token("admin-boss", common::ADMIN_EMAIL);
    let res = client
        .post(server.url("/admin/results"))
        .bearer_auth(&admin)
        .json(&result)
        .send()
        .await?;
    let (status, body) = common::json_body(res).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["message"], "Admin verification required");
    Ok(())
}

#[tokio::test]
async fn challenge_requests_are_rate_limited() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let fan = common::token("admin-fan2", "fan2@example.com");
    let res = client.post(server.url("/api/admin/challenge")).bearer_auth(&fan).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // development profile allows five per admin per hour
    let admin = common::token("admin-boss", common::ADMIN_EMAIL);
    for _ in 0..5 {
        let res = client.post(server.url("/api/admin/challenge")).bearer_auth(&admin).send().await?;
        let (status, body) = common::json_body(res).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["sentTo"], common::ADMIN_EMAIL);
    }
    let res = client.post(server.url("/api/admin/challenge")).bearer_auth(&admin).send().await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}

#[tokio::test]
async fn bogus_verification_token_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let admin = common::token("admin-boss3", common::ADMIN_EMAIL);
    let res = reqwest::Client::new()
        .post(server.url("/api/admin/verify"))
        .bearer_auth(&admin)
        .json(&json!({ "token": "deadbeef" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get("set-cookie").is_none());
    Ok(())
}
