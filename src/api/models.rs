use crate::api::TagsResponse;
use crate::utils::url::construct_api_url;

/// Used when the backend reports no models or cannot be reached.
pub const DEFAULT_MODEL: &str = "gemma3:4b-it-qat";

#[derive(Debug, thiserror::Error)]
pub enum ModelsError {
    #[error("failed to reach {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("model listing failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid model listing: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Fetch installed model names from `GET /api/tags`, sorted by name.
pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<Vec<String>, ModelsError> {
    let url = construct_api_url(base_url, "api/tags");
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|source| ModelsError::Request {
            url: url.clone(),
            source,
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(ModelsError::Status { status, body });
    }

    let tags = response
        .json::<TagsResponse>()
        .await
        .map_err(ModelsError::Decode)?;
    let mut names: Vec<String> = tags.models.into_iter().map(|model| model.name).collect();
    sort_models(&mut names);
    Ok(names)
}

pub fn sort_models(models: &mut [String]) {
    models.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then(a.cmp(b)));
}

/// Pick the model to start with: the preferred one when given, otherwise
/// [`DEFAULT_MODEL`]. Installed models are only offered through the picker.
pub fn resolve_startup_model(preferred: Option<&str>) -> String {
    match preferred {
        Some(model) if !model.trim().is_empty() => model.to_string(),
        _ => DEFAULT_MODEL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_models_is_case_insensitive() {
        let mut models = vec![
            "mistral:7b".to_string(),
            "Gemma3:4b".to_string(),
            "llama3.2".to_string(),
        ];
        sort_models(&mut models);
        assert_eq!(models, vec!["Gemma3:4b", "llama3.2", "mistral:7b"]);
    }

    #[test]
    fn startup_model_prefers_explicit_choice() {
        assert_eq!(resolve_startup_model(Some("qwen3")), "qwen3");
    }

    #[test]
    fn startup_model_falls_back_to_default() {
        assert_eq!(resolve_startup_model(None), DEFAULT_MODEL);
        assert_eq!(resolve_startup_model(Some("  ")), DEFAULT_MODEL);
    }
}
