use axum::response::IntoResponse;

// Plain-text banner for `/`, kept out of the API document.
pub async fn root() -> impl IntoResponse {
    format!(
        "{} {} - {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        crate::GIT_COMMIT_HASH
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn banner_names_the_service() -> Result<()> {
        let response = root().await.into_response();
        let bytes = response.into_body().collect().await?.to_bytes();
        let banner = String::from_utf8(bytes.to_vec())?;
        assert!(banner.starts_with(env!("CARGO_PKG_NAME")));
        Ok(())
    }
}
