//! Manifest template loading and placeholder substitution.
//!
//! Templates use `{{Key}}` tokens. Rendering is a single pass over the
//! template, so the order of the substitution map never matters, and every
//! token the template declares must have a value: a declared token without a
//! substitution is an [`Error::UnresolvedPlaceholder`], never silently left in
//! the output.

use crate::bundler::error::{Error, Result};
use handlebars::{Handlebars, RenderErrorReason};
use regex::Regex;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// Matches any `{{...}}` token, tolerating inner whitespace.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("placeholder pattern is valid")
});

/// Returns the set of placeholder keys declared by a template.
pub fn placeholders(template_text: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(template_text)
        .map(|c| c[1].to_string())
        .collect()
}

/// A loaded manifest template.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    name: String,
    text: String,
}

impl TemplateEngine {
    /// Loads a template file.
    ///
    /// # Errors
    ///
    /// [`Error::TemplateRead`] if the file cannot be read.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|error| Error::TemplateRead {
                path: path.to_path_buf(),
                error,
            })?;

        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            text,
        })
    }

    /// Template name, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the template with `substitutions`.
    pub fn render(&self, substitutions: &BTreeMap<String, String>) -> Result<String> {
        render_named(&self.name, &self.text, substitutions)
    }
}

/// Replaces every `{{Key}}` token in `template_text` with its value.
///
/// Keys present in `substitutions` but absent from the template are ignored.
///
/// # Errors
///
/// [`Error::UnresolvedPlaceholder`] listing every declared key that has no
/// substitution.
///
/// ```
/// use std::collections::BTreeMap;
/// use kodegen_bundler_installer::bundler::template::render;
///
/// let mut values = BTreeMap::new();
/// values.insert("ApplicationName".to_string(), "Sample App".to_string());
/// assert_eq!(render("<{{ApplicationName}}/>", &values).unwrap(), "<Sample App/>");
/// ```
pub fn render(template_text: &str, substitutions: &BTreeMap<String, String>) -> Result<String> {
    render_named("template", template_text, substitutions)
}

fn render_named(
    name: &str,
    template_text: &str,
    substitutions: &BTreeMap<String, String>,
) -> Result<String> {
    let missing: Vec<String> = placeholders(template_text)
        .into_iter()
        .filter(|key| !substitutions.contains_key(key))
        .collect();

    if !missing.is_empty() {
        return Err(Error::UnresolvedPlaceholder {
            template: name.to_string(),
            placeholders: missing,
        });
    }

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    let rendered = handlebars
        .render_template(template_text, substitutions)
        .map_err(|error| {
            if let RenderErrorReason::MissingVariable(path) = error.reason() {
                return Error::UnresolvedPlaceholder {
                    template: name.to_string(),
                    placeholders: vec![path.clone().unwrap_or_default()],
                };
            }
            Error::from(error)
        })?;
    log::debug!(
        "Rendered template {} with {} substitutions",
        name,
        substitutions.len()
    );

    Ok(rendered)
}

/// Location of a family's template inside the template directory.
pub fn template_path(template_directory: &Path, relative: &str) -> PathBuf {
    template_directory.join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_every_occurrence() {
        let out = render(
            "{{Name}} by {{Maker}}; again {{Name}}",
            &values(&[("Name", "App"), ("Maker", "Acme")]),
        )
        .unwrap();
        assert_eq!(out, "App by Acme; again App");
        assert!(!out.contains("{{"));
    }

    #[test]
    fn values_are_not_escaped() {
        let out = render("{{Path}}", &values(&[("Path", "a<b>&\"c\"")])).unwrap();
        assert_eq!(out, "a<b>&\"c\"");
    }

    #[test]
    fn unresolved_tokens_fail_loudly() {
        let err = render(
            "{{ApplicationName}} {{ApplicationGuid}} {{Manufacturer}}",
            &values(&[("ApplicationName", "App")]),
        )
        .unwrap_err();

        match err {
            Error::UnresolvedPlaceholder { placeholders, .. } => {
                assert_eq!(placeholders, vec!["ApplicationGuid", "Manufacturer"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tokens_outside_identifier_syntax_are_unresolved() {
        for text in ["{{Install-Dir}}", "{{Product.Name}}"] {
            let err = render(text, &values(&[("ApplicationName", "App")])).unwrap_err();
            assert_eq!(err.kind_name(), "UnresolvedPlaceholder", "{text}");
        }
    }

    #[test]
    fn extra_substitutions_are_ignored() {
        let out = render("plain", &values(&[("Unused", "x")])).unwrap();
        assert_eq!(out, "plain");
    }

    #[test]
    fn substitution_order_does_not_matter() {
        let text = "{{A}}-{{B}}";
        let forward = render(text, &values(&[("A", "1"), ("B", "2")])).unwrap();
        let reverse = render(text, &values(&[("B", "2"), ("A", "1")])).unwrap();
        assert_eq!(forward, reverse);
    }

    #[test]
    fn collects_declared_placeholders() {
        let keys = placeholders("{{ A }} {{B}} {{A}} $(var.X)");
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn missing_template_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TemplateEngine::load(&dir.path().join("missing.wxs"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TemplateRead { .. }));
    }

    #[tokio::test]
    async fn loads_and_renders_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Product.wxs");
        std::fs::write(&path, "<Package Name=\"{{ApplicationName}}\" />").unwrap();

        let template = TemplateEngine::load(&path).await.unwrap();
        assert_eq!(template.name(), "Product.wxs");

        let out = template
            .render(&values(&[("ApplicationName", "Sample App")]))
            .unwrap();
        assert_eq!(out, "<Package Name=\"Sample App\" />");
    }
}
