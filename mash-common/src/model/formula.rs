// mash-common/src/model/formula.rs
// The declarative formula record: how to fetch, build, install and test one
// package. Loaded from a JSON definition and never mutated afterwards.

use std::path::{Component, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MashError, Result};

/// One entry of the install mapping: a path in the built source tree paired
/// with the name it installs under in the prefix bin directory.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InstallEntry {
    pub source: PathBuf,
    pub dest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Formula {
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub version: String,

    /// Source download URL
    pub url: String,
    /// SHA256 checksum for the source archive
    pub sha256: String,

    /// Optional mirrors for the source archive
    #[serde(default)]
    pub mirrors: Vec<String>,

    #[serde(default)]
    pub license: Option<String>,

    /// Build-time dependency names. Informational only; resolution across
    /// formulae is out of scope.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Build command argv, run with the source tree as working directory.
    pub build: Vec<String>,

    /// Ordered install mapping applied after a successful build.
    #[serde(deserialize_with = "deserialize_install_mapping")]
    pub install: Vec<InstallEntry>,

    /// Smoke test argv. `#{bin}` and `#{prefix}` tokens are substituted
    /// before execution. May be empty, in which case the test stage is a
    /// no-op.
    #[serde(default)]
    pub test: Vec<String>,
}

impl Formula {
    // --- Accessors ---
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the primary source download URL.
    pub fn source_url(&self) -> &str {
        &self.url
    }

    /// Gets the expected SHA256 for the source download.
    pub fn source_sha256(&self) -> &str {
        &self.sha256
    }

    /// Checks the structural invariants of a parsed formula. Called once at
    /// load time; stages may assume a validated formula afterwards.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.contains('/') {
            return Err(MashError::Validation(format!(
                "Invalid formula name '{}'",
                self.name
            )));
        }
        if self.url.is_empty() {
            return Err(MashError::Validation(format!(
                "Formula '{}' has no source URL",
                self.name
            )));
        }
        if self.sha256.len() != 64 || !self.sha256.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MashError::Validation(format!(
                "Formula '{}' sha256 must be 64 hex characters, got '{}'",
                self.name, self.sha256
            )));
        }
        if self.build.is_empty() {
            return Err(MashError::Validation(format!(
                "Formula '{}' has no build command",
                self.name
            )));
        }
        if self.install.is_empty() {
            return Err(MashError::Validation(format!(
                "Formula '{}' has an empty install mapping",
                self.name
            )));
        }
        for entry in &self.install {
            if entry.source.is_absolute()
                || entry
                    .source
                    .components()
                    .any(|c| matches!(c, Component::ParentDir))
            {
                return Err(MashError::Validation(format!(
                    "Install source '{}' must be a relative path inside the build tree",
                    entry.source.display()
                )));
            }
            if entry.dest.is_empty() || entry.dest.contains('/') {
                return Err(MashError::Validation(format!(
                    "Install destination '{}' must be a bare file name",
                    entry.dest
                )));
            }
        }
        Ok(())
    }
}

/// Deserializes the install mapping from any of the accepted shapes:
/// an ordered array of `{"source": .., "dest": ..}` objects, an array of
/// `[source, dest]` pairs or bare source strings (destination defaults to
/// the file name), or a `{"source": "dest"}` shorthand map.
fn deserialize_install_mapping<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<InstallEntry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use std::fmt;

    use serde::de::{self, MapAccess, SeqAccess, Visitor};

    fn entry_from_source(source: String) -> InstallEntry {
        let source = PathBuf::from(source);
        let dest = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        InstallEntry { source, dest }
    }

    struct MappingVisitor;

    impl<'de> Visitor<'de> for MappingVisitor {
        type Value = Vec<InstallEntry>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an install mapping as a list of entries or a source-to-dest map")
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut entries = Vec::new();
            while let Some(value) = seq.next_element::<Value>()? {
                match value {
                    Value::String(s) => entries.push(entry_from_source(s)),
                    Value::Array(pair) => {
                        let [Value::String(source), Value::String(dest)] = pair.as_slice() else {
                            return Err(de::Error::invalid_type(
                                de::Unexpected::Seq,
                                &"a [source, dest] string pair",
                            ));
                        };
                        entries.push(InstallEntry {
                            source: PathBuf::from(source),
                            dest: dest.clone(),
                        });
                    }
                    Value::Object(map) => {
                        let source = map
                            .get("source")
                            .and_then(Value::as_str)
                            .ok_or_else(|| de::Error::missing_field("source in install entry"))?;
                        let dest = map.get("dest").and_then(Value::as_str);
                        entries.push(match dest {
                            Some(dest) => InstallEntry {
                                source: PathBuf::from(source),
                                dest: dest.to_string(),
                            },
                            None => entry_from_source(source.to_string()),
                        });
                    }
                    _ => {
                        return Err(de::Error::invalid_type(
                            de::Unexpected::Other("non-string/object install entry"),
                            &self,
                        ))
                    }
                }
            }
            Ok(entries)
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            // Entries are collected in document order.
            let mut entries = Vec::new();
            while let Some((source, dest)) = map.next_entry::<String, String>()? {
                entries.push(InstallEntry {
                    source: PathBuf::from(source),
                    dest,
                });
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_any(MappingVisitor)
}
