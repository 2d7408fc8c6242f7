mod common;

use anyhow::Result;
use prix_six::auth::{generate_jwt, Claims};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn missing_token_is_unauthorized() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/api/users/me")).await?;
    let (status, body) = common::json_body(res).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn token_signed_with_other_secret_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let forged = generate_jwt(&Claims::new("mallory", "m@example.com", 1), "not-the-secret")?;
    let res = reqwest::Client::new()
        .get(server.url("/api/users/me"))
        .bearer_auth(forged)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn profile_is_created_and_renamed() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::token("auth-u1", "max.fan@example.com");

    let res = client.get(server.url("/api/users/me")).bearer_auth(&token).send().await?;
    let (status, body) = common::json_body(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["teamName"], "max.fan");

    let res = client
        .put(server.url("/api/users/me"))
        .bearer_auth(&token)
        .json(&json!({ "teamName": "Orange Army", "secondaryTeamName": "Simply Lovely" }))
        .send()
        .await?;
    let (status, body) = common::json_body(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["teamName"], "Orange Army");
    assert_eq!(body["data"]["secondaryTeamName"], "Simply Lovely");

    // team names are unique across users, case-insensitively
    let other = common::token("auth-u2", "rival@example.com");
    let res = client
        .put(server.url("/api/users/me"))
        .bearer_auth(&other)
        .json(&json!({ "teamName": "orange army" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    Ok(())
}
