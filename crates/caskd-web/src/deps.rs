//! Generated `deps.js` dependency manifest.
//!
//! Closure's module loader needs a manifest mapping each script to the
//! namespaces it provides and requires. Rather than shipping a checked-in
//! copy that can go stale, the front-end generates it on the fly by
//! scanning the UI scripts for `goog.provide` / `goog.require` calls.

use std::fmt::Write as _;

use regex::Regex;
use thiserror::Error;

use caskd_core::StaticSource;

/// Error generating the dependency manifest.
#[derive(Debug, Error)]
pub enum DepsError {
    /// A script could not be read back from the static source.
    #[error("failed to read {file:?}: {source}")]
    Read {
        /// The script name.
        file: String,
        /// Underlying open error.
        #[source]
        source: std::io::Error,
    },
}

/// One scanned script and the namespaces it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScriptDeps {
    file: String,
    provides: Vec<String>,
    requires: Vec<String>,
}

/// Generates the manifest body: one `goog.addDependency` line per script,
/// in file-name order so repeated generations are byte-identical.
pub fn gen_deps(source: &dyn StaticSource) -> Result<String, DepsError> {
    let call = Regex::new(r#"goog\.(provide|require)\s*\(\s*['"]([^'"]+)['"]\s*\)"#)
        .expect("goog call pattern");

    let mut out = String::new();
    for file in source.names() {
        if !file.ends_with(".js") {
            continue;
        }
        let content = source
            .open(&file)
            .map_err(|source| DepsError::Read {
                file: file.clone(),
                source,
            })?
            .content;
        let text = String::from_utf8_lossy(&content);

        let mut deps = ScriptDeps {
            file,
            provides: Vec::new(),
            requires: Vec::new(),
        };
        for caps in call.captures_iter(&text) {
            let namespace = caps[2].to_string();
            match &caps[1] {
                "provide" => deps.provides.push(namespace),
                _ => deps.requires.push(namespace),
            }
        }
        if deps.provides.is_empty() && deps.requires.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            "goog.addDependency('{}', {}, {});",
            deps.file,
            quote_list(&deps.provides),
            quote_list(&deps.requires)
        );
    }
    Ok(out)
}

fn quote_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|i| format!("'{i}'")).collect();
    format!("[{}]", quoted.join(", "))
}
