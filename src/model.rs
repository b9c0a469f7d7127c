//! §3 data model: the types flowing between the crawl components.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A dotted string addressing a value within the flake's attribute tree,
/// e.g. `haskellPackages.hello`. The empty string denotes the root.
///
/// Newtype rather than a bare `String` so that identity comparisons (the
/// Visited Set, edge targets) can't accidentally be confused with other
/// string-shaped fields like `OutputPath`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributePath(pub String);

impl AttributePath {
    pub fn root() -> Self {
        AttributePath(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extend this path with a child key, Nix attribute-path style.
    pub fn join(&self, key: &str) -> Self {
        if self.0.is_empty() {
            AttributePath(key.to_string())
        } else {
            AttributePath(format!("{}.{}", self.0, key))
        }
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AttributePath {
    fn from(s: String) -> Self {
        AttributePath(s)
    }
}

impl From<&str> for AttributePath {
    fn from(s: &str) -> Self {
        AttributePath(s.to_string())
    }
}

/// An absolute store path produced by realising a derivation. Opaque,
/// compared by byte equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputPath(pub String);

/// An absolute store path of the `.drv` file. Absent when the target
/// system isn't in the derivation's declared platforms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DerivationPath(pub String);

/// `(spdx_id?, full_name?)`. Normalised to a list: a scalar license is
/// wrapped in a singleton, absence becomes `[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spdx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Matches the package manager's `parseDrvName` convention: the version
/// starts at the first `-` immediately followed by a digit.
static VERSION_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"-[0-9]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedName {
    pub name: String,
    pub version: Option<String>,
}

impl ParsedName {
    /// Split a raw derivation name such as `hello-2.12.1` into
    /// `{name: "hello", version: "2.12.1"}`. Names with no recognisable
    /// version marker (`linux-kernel`, `hello`) are returned whole with no
    /// version, mirroring the package manager's own fallback.
    pub fn parse(raw: &str) -> Self {
        match VERSION_SPLIT.find(raw) {
            Some(m) => ParsedName {
                name: raw[..m.start()].to_string(),
                version: Some(raw[m.start() + 1..].to_string()),
            },
            None => ParsedName {
                name: raw.to_string(),
                version: None,
            },
        }
    }
}

/// One multi-output entry: `{ name, output_path }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    pub output_path: Option<OutputPath>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NixpkgsMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broken: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<License>,
}

/// `{ git_repo_url, rev }`, present only when the source is a known git
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrcRef {
    pub git_repo_url: String,
    pub rev: String,
}

/// One of `build_input`, `propagated_build_input`, `native_build_input`, or
/// (in the generalised describer) the raw attribute key that supplied the
/// edge. Always serialises as a plain string — `Other` is not externally
/// tagged, since the generalised describer's output is documented to carry
/// the raw attribute key as-is (`checkInputs`, `propagatedNativeBuildInputs`,
/// ...), not `{"other": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildInputType {
    BuildInput,
    PropagatedBuildInput,
    NativeBuildInput,
    Other(String),
}

impl Serialize for BuildInputType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BuildInputType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "build_input" => BuildInputType::BuildInput,
            "propagated_build_input" => BuildInputType::PropagatedBuildInput,
            "native_build_input" => BuildInputType::NativeBuildInput,
            _ => BuildInputType::Other(s),
        })
    }
}

impl BuildInputType {
    fn as_str(&self) -> &str {
        match self {
            BuildInputType::BuildInput => "build_input",
            BuildInputType::PropagatedBuildInput => "propagated_build_input",
            BuildInputType::NativeBuildInput => "native_build_input",
            BuildInputType::Other(key) => key,
        }
    }

    pub fn from_attr_key(key: &str) -> Self {
        match key {
            "buildInputs" => BuildInputType::BuildInput,
            "propagatedBuildInputs" => BuildInputType::PropagatedBuildInput,
            "nativeBuildInputs" => BuildInputType::NativeBuildInput,
            other => BuildInputType::Other(other.to_string()),
        }
    }

    /// `native_build_input` edges are suppressed at description time in
    /// runtime-only mode.
    pub fn is_native(&self) -> bool {
        matches!(self, BuildInputType::NativeBuildInput)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInputEdge {
    pub build_input_type: BuildInputType,
    pub attribute_path: AttributePath,
    pub output_path: Option<OutputPath>,
}

/// The full node record emitted by the Description Pipeline (C6) and
/// consumed by the Output Sink (C7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationRecord {
    pub name: String,
    pub parsed_name: ParsedName,
    pub attribute_path: AttributePath,
    pub derivation_path: Option<DerivationPath>,
    pub output_path: Option<OutputPath>,
    pub outputs: Vec<Output>,
    pub nixpkgs_metadata: NixpkgsMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<SrcRef>,
    pub build_inputs: Vec<BuildInputEdge>,
}

/// One entry yielded by the Finder's trace stream:
/// `{ attributePath, derivationPath, outputPath }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FoundDrv {
    #[serde(rename = "attributePath")]
    pub attribute_path: AttributePath,
    #[serde(rename = "derivationPath")]
    pub derivation_path: Option<DerivationPath>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<OutputPath>,
}

/// The `{ "foundDrvs": [...] }` payload on one Finder `trace: <json>` line.
#[derive(Debug, Clone, Deserialize)]
pub struct FinderTrace {
    #[serde(rename = "foundDrvs")]
    pub found_drvs: Vec<FoundDrv>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_version() {
        let p = ParsedName::parse("hello-2.12.1");
        assert_eq!(p.name, "hello");
        assert_eq!(p.version.as_deref(), Some("2.12.1"));
    }

    #[test]
    fn parses_name_with_dashed_words() {
        let p = ParsedName::parse("linux-kernel-5.19");
        assert_eq!(p.name, "linux-kernel");
        assert_eq!(p.version.as_deref(), Some("5.19"));
    }

    #[test]
    fn falls_back_when_no_version_marker() {
        let p = ParsedName::parse("hello");
        assert_eq!(p.name, "hello");
        assert_eq!(p.version, None);
    }

    #[test]
    fn attribute_path_join() {
        let root = AttributePath::root();
        assert!(root.is_root());
        let a = root.join("haskellPackages");
        let b = a.join("hello");
        assert_eq!(b.as_str(), "haskellPackages.hello");
    }

    #[test]
    fn build_input_type_from_attr_key() {
        assert_eq!(
            BuildInputType::from_attr_key("nativeBuildInputs"),
            BuildInputType::NativeBuildInput
        );
        assert!(BuildInputType::from_attr_key("nativeBuildInputs").is_native());
        assert!(!BuildInputType::from_attr_key("buildInputs").is_native());
        assert_eq!(
            BuildInputType::from_attr_key("checkInputs"),
            BuildInputType::Other("checkInputs".to_string())
        );
    }

    #[test]
    fn build_input_type_serialises_as_a_plain_string() {
        assert_eq!(
            serde_json::to_string(&BuildInputType::NativeBuildInput).unwrap(),
            "\"native_build_input\""
        );
        let raw_key = BuildInputType::Other("checkInputs".to_string());
        assert_eq!(serde_json::to_string(&raw_key).unwrap(), "\"checkInputs\"");
        assert_eq!(
            serde_json::from_str::<BuildInputType>("\"checkInputs\"").unwrap(),
            raw_key
        );
        assert_eq!(
            serde_json::from_str::<BuildInputType>("\"build_input\"").unwrap(),
            BuildInputType::BuildInput
        );
    }

    #[test]
    fn found_drv_deserializes_camel_case() {
        let json = r#"{"attributePath":"pkg1","derivationPath":"/nix/store/x.drv","outputPath":"/nix/store/x"}"#;
        let f: FoundDrv = serde_json::from_str(json).unwrap();
        assert_eq!(f.attribute_path.as_str(), "pkg1");
        assert_eq!(f.derivation_path.unwrap().0, "/nix/store/x.drv");
    }

    #[test]
    fn found_drv_allows_null_paths() {
        let json = r#"{"attributePath":"pkg1","derivationPath":null,"outputPath":null}"#;
        let f: FoundDrv = serde_json::from_str(json).unwrap();
        assert!(f.derivation_path.is_none());
        assert!(f.output_path.is_none());
    }
}
