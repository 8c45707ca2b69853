//! Launch URL query rewriting.
//!
//! An issued launch URL carries the upstream LRS base and fetch URL as the
//! `endpoint` and `fetch` query parameters. The gateway swaps those two
//! values for its own session-scoped URLs and leaves everything else in the
//! URL untouched.

use anyhow::{Context, Result, anyhow};
use url::Url;

/// Replace the values of named query parameters.
///
/// Every pair not named in `replacements` is preserved in its original
/// position and order. A replaced parameter keeps its position; duplicate
/// occurrences of a replaced parameter are collapsed into the first one.
/// Replacements for parameters the URL does not carry are appended at the
/// end, so extracting a replaced name from the result always yields the
/// replacement value.
pub fn replace_query_params(url: &str, replacements: &[(&str, &str)]) -> Result<String> {
    let mut parsed = Url::parse(url).with_context(|| format!("parsing URL {url}"))?;
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut applied = vec![false; replacements.len()];
    {
        let mut query = parsed.query_pairs_mut();
        query.clear();
        for (name, value) in &pairs {
            match replacements.iter().position(|(n, _)| n == name) {
                Some(idx) if !applied[idx] => {
                    applied[idx] = true;
                    query.append_pair(name, replacements[idx].1);
                }
                Some(_) => {}
                None => {
                    query.append_pair(name, value);
                }
            }
        }
        for (idx, (name, value)) in replacements.iter().enumerate() {
            if !applied[idx] {
                query.append_pair(name, value);
            }
        }
    }

    Ok(parsed.into())
}

/// Extract the upstream `endpoint` and `fetch` values from an issued launch
/// URL. Both must be present; a launch URL without them is an upstream
/// contract violation.
pub fn launch_parameters(url: &str) -> Result<(String, String)> {
    let parsed = Url::parse(url).with_context(|| format!("parsing launch URL {url}"))?;

    let mut endpoint = None;
    let mut fetch = None;
    for (name, value) in parsed.query_pairs() {
        match name.as_ref() {
            "endpoint" if endpoint.is_none() => endpoint = Some(value.into_owned()),
            "fetch" if fetch.is_none() => fetch = Some(value.into_owned()),
            _ => {}
        }
    }

    let endpoint = endpoint.ok_or_else(|| anyhow!("launch URL has no endpoint parameter"))?;
    let fetch = fetch.ok_or_else(|| anyhow!("launch URL has no fetch parameter"))?;
    Ok((endpoint, fetch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(url: &str, name: &str) -> Option<String> {
        let parsed = Url::parse(url).unwrap();
        parsed
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_replace_keeps_other_params_and_path() {
        let url = "https://player/launch?endpoint=https://player/lrs&fetch=https://player/fetch&x=1";
        let result = replace_query_params(
            url,
            &[
                ("endpoint", "https://cts/sessions/7/lrs"),
                ("fetch", "https://cts/sessions/7/fetch"),
            ],
        )
        .unwrap();

        let parsed = Url::parse(&result).unwrap();
        assert_eq!(parsed.path(), "/launch");
        assert_eq!(parsed.host_str(), Some("player"));
        assert_eq!(param(&result, "x").as_deref(), Some("1"));
        assert_eq!(
            param(&result, "endpoint").as_deref(),
            Some("https://cts/sessions/7/lrs")
        );
        assert_eq!(
            param(&result, "fetch").as_deref(),
            Some("https://cts/sessions/7/fetch")
        );
    }

    #[test]
    fn test_replace_preserves_pair_order() {
        let url = "https://player/launch?a=1&endpoint=E&b=2&fetch=F&c=3";
        let result = replace_query_params(url, &[("endpoint", "X"), ("fetch", "Y")]).unwrap();
        let parsed = Url::parse(&result).unwrap();
        let names: Vec<String> = parsed.query_pairs().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(names, vec!["a", "endpoint", "b", "fetch", "c"]);
    }

    #[test]
    fn test_replace_appends_missing_param() {
        let result = replace_query_params("https://player/launch?x=1", &[("endpoint", "E")]).unwrap();
        assert_eq!(param(&result, "x").as_deref(), Some("1"));
        assert_eq!(param(&result, "endpoint").as_deref(), Some("E"));
    }

    #[test]
    fn test_replace_collapses_duplicates() {
        let url = "https://player/launch?endpoint=old1&endpoint=old2&x=1";
        let result = replace_query_params(url, &[("endpoint", "new")]).unwrap();
        let parsed = Url::parse(&result).unwrap();
        let endpoints: Vec<String> = parsed
            .query_pairs()
            .filter(|(k, _)| k == "endpoint")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(endpoints, vec!["new"]);
        assert_eq!(param(&result, "x").as_deref(), Some("1"));
    }

    #[test]
    fn test_replace_rejects_invalid_url() {
        assert!(replace_query_params("not a url", &[("endpoint", "E")]).is_err());
    }

    #[test]
    fn test_round_trip() {
        let url = "https://player/launch?endpoint=https://player/lrs&fetch=https://player/fetch&x=1&y=two%20words";
        let gateway_endpoint = "https://cts/sessions/42/lrs";
        let gateway_fetch = "https://cts/sessions/42/fetch";
        let result = replace_query_params(
            url,
            &[("endpoint", gateway_endpoint), ("fetch", gateway_fetch)],
        )
        .unwrap();

        let (endpoint, fetch) = launch_parameters(&result).unwrap();
        assert_eq!(endpoint, gateway_endpoint);
        assert_eq!(fetch, gateway_fetch);
        assert_eq!(param(&result, "y").as_deref(), Some("two words"));
    }

    #[test]
    fn test_launch_parameters_extracts_both() {
        let (endpoint, fetch) =
            launch_parameters("https://player/launch?endpoint=https://player/lrs&fetch=https://player/fetch")
                .unwrap();
        assert_eq!(endpoint, "https://player/lrs");
        assert_eq!(fetch, "https://player/fetch");
    }

    #[test]
    fn test_launch_parameters_requires_endpoint() {
        let err = launch_parameters("https://player/launch?fetch=F").unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn test_launch_parameters_requires_fetch() {
        let err = launch_parameters("https://player/launch?endpoint=E").unwrap_err();
        assert!(err.to_string().contains("fetch"));
    }
}
