//! Configuration for the binding layer and its collaborators.
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration:
//!
//! ```toml
//! [bindings]
//! out_params = ["_outvar"]
//! function_return_params = ["_retval"]
//! null_arrays = "passthrough"
//!
//! [bindings.type_patterns]
//! int = '^[+-]?\d+$'
//!
//! [connection]
//! user = "app"
//! connect_string = "dbhost:1521/ORCL"
//!
//! [cursor]
//! out_cursors = ["return_outcur"]
//! ```

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default float pattern: decimals and scientific notation.
///
/// The exponent sign may arrive as a space when a `+` was decoded out of a
/// query string.
pub const DEFAULT_FLOAT_PATTERN: &str =
    r"^[+-]?(\d+\.\d*|\.\d+)([eE][+\- ]?\d+)?$|^[+-]?\d+[eE][+\- ]?\d+$";

/// Default generic-number pattern: grouped or currency-formatted numerics.
pub const DEFAULT_NUM_PATTERN: &str =
    r"^[+-]?\$?\d{1,3}(,\d{3})+(\.\d+)?$|^[+-]?\$\d+(\.\d+)?$";

/// Default integer pattern.
pub const DEFAULT_INT_PATTERN: &str = r"^[+-]?\d+$";

/// Default date pattern: `2024-01-31`, `31/01/2024`, `31-JAN-24`, optional time.
pub const DEFAULT_DATE_PATTERN: &str =
    r"^\d{1,4}[/.-](\d{1,2}|[A-Za-z]{3})[/.-]\d{2,4}([ T]\d{1,2}:\d{2}(:\d{2})?)?$";

/// Default verbose package call: `BEGIN [:ret :=] schema.pkg.proc(:a, :b); END;`
pub const DEFAULT_PACKAGE_CALL_PATTERN: &str =
    r"^BEGIN\s+((:\w+)(\s*)(:=)(\s*))?(\w+\.\w+\.\w+)(\(((:)?(\w)*,?\s*)+\))?;\s*END;$";

/// Default pass-through CRUD statement.
pub const DEFAULT_PASS_THROUGH_PATTERN: &str =
    r"^(SELECT((\s\w+)+,?).+FROM(\s\w+)|UPDATE\s\w+(\s\w+)?\s?SET|DELETE\sFROM(\s\w+)|INSERT\sINTO(\s\w+))";

/// Default connect string pattern: a full descriptor or `host[:port]/service`.
pub const DEFAULT_CONNECT_PATTERN: &str = r"(?i)\(DESCRIPTION\s?=\s?\(ADDRESS_LIST\s?=\s?\(ADDRESS\s?=\s?\(PROTOCOL\s?=\s?\w{3}\)\(HOST\s?=\s?(\w+\.)+\w{2,4}\)\(PORT\s?=\s?(\d{4,5})\)\)\)\(CONNECT_DATA\s?=\s?\((SERVICE_NAME|SID)\s?=\s?[\w.]{2,64}\)\)\)|^[\w.-]+(:\d{1,5})?/[\w.]+$";

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbalConfig {
    /// Parameter binding conventions.
    pub bindings: BindingsConfig,
    /// Statement classification.
    pub statement: StatementConfig,
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// OUT cursor placeholders.
    pub cursor: CursorConfig,
    /// Result fetching.
    pub result: ResultConfig,
}

impl DbalConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

/// Binding conventions: OUT-name suffixes, inference patterns, allow-lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingsConfig {
    /// Substrings marking a parameter as an OUT variable.
    pub out_params: Vec<String>,
    /// Substrings marking a parameter as a function return.
    pub function_return_params: Vec<String>,
    /// Regex sources used for type inference.
    pub type_patterns: TypePatternConfig,
    /// Symbolic types accepted from callers.
    pub allowed_bind_types: AllowedBindTypes,
    /// What to do with arrays containing NULL.
    pub null_arrays: NullArrayPolicy,
}

impl Default for BindingsConfig {
    fn default() -> Self {
        Self {
            out_params: vec!["_outvar".to_string()],
            function_return_params: vec!["_retval".to_string()],
            type_patterns: TypePatternConfig::default(),
            allowed_bind_types: AllowedBindTypes::default(),
            null_arrays: NullArrayPolicy::default(),
        }
    }
}

impl BindingsConfig {
    /// All OUT and function-return suffixes together.
    pub fn out_suffixes(&self) -> Vec<String> {
        self.out_params
            .iter()
            .chain(self.function_return_params.iter())
            .filter(|s| !s.is_empty())
            .cloned()
            .collect()
    }
}

/// Regex sources for type inference, tried in the order float, num, int, date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypePatternConfig {
    pub float: String,
    pub num: String,
    pub int: String,
    pub date: String,
}

impl Default for TypePatternConfig {
    fn default() -> Self {
        Self {
            float: DEFAULT_FLOAT_PATTERN.to_string(),
            num: DEFAULT_NUM_PATTERN.to_string(),
            int: DEFAULT_INT_PATTERN.to_string(),
            date: DEFAULT_DATE_PATTERN.to_string(),
        }
    }
}

/// Allow-list of symbolic bind types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowedBindTypes {
    /// Types valid for array IN parameters.
    pub in_arrays: Vec<String>,
    /// Types valid for OUT variables.
    pub outvars: Vec<String>,
}

impl Default for AllowedBindTypes {
    fn default() -> Self {
        Self {
            in_arrays: ["SQLT_INT", "SQLT_FLT", "SQLT_CHR", "SQLT_ODT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            outvars: ["SQLT_CHR", "SQLT_NUM"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl AllowedBindTypes {
    /// Check a symbolic `SQLT_*` name against both lists.
    pub fn allows(&self, name: &str) -> bool {
        self.in_arrays.iter().chain(self.outvars.iter()).any(|t| t == name)
    }
}

/// Handling of arrays that contain NULL elements.
///
/// No strategy is known to make the driver bind such arrays reliably;
/// `Passthrough` hands them over untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullArrayPolicy {
    /// Bind the array as-is with auto item length.
    #[default]
    Passthrough,
    /// Bind as-is but size items from the longest non-null element.
    MeasureItems,
}

/// Statement classification patterns, in priority order.
///
/// Index 0 is a verbose package call; index 1 is pass-through CRUD SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementConfig {
    pub sqltypes: Vec<String>,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            sqltypes: vec![
                DEFAULT_PACKAGE_CALL_PATTERN.to_string(),
                DEFAULT_PASS_THROUGH_PATTERN.to_string(),
            ],
        }
    }
}

/// How a connection is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectFlavor {
    /// Regular connect; may share an existing session.
    #[default]
    Default,
    /// Always a new, separate session.
    New,
    /// Persistent session kept across requests.
    Persistent,
}

/// Connection settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Database username.
    pub user: String,
    /// Database password.
    pub password: String,
    /// Connect descriptor or easy-connect string.
    pub connect_string: String,
    /// Pattern the connect string must match.
    pub connect_regex: String,
    /// Connection flavor.
    pub flavor: ConnectFlavor,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            connect_string: String::new(),
            connect_regex: DEFAULT_CONNECT_PATTERN.to_string(),
            flavor: ConnectFlavor::Default,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("connect_string", &self.connect_string)
            .field("flavor", &self.flavor)
            .finish()
    }
}

impl ConnectionConfig {
    /// Create connection settings.
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        connect_string: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            connect_string: connect_string.into(),
            ..Self::default()
        }
    }

    /// Set the connection flavor.
    pub fn with_flavor(mut self, flavor: ConnectFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Override credentials from `ORACLE_USER`, `ORACLE_PASSWORD` and
    /// `ORACLE_CONNECT_STRING`, reading a `.env` file first if present.
    pub fn with_env_overrides(mut self) -> Self {
        dotenvy::dotenv().ok();
        if let Ok(user) = std::env::var("ORACLE_USER") {
            self.user = user;
        }
        if let Ok(password) = std::env::var("ORACLE_PASSWORD") {
            self.password = password;
        }
        if let Ok(connect_string) = std::env::var("ORACLE_CONNECT_STRING") {
            self.connect_string = connect_string;
        }
        self
    }

    /// Validate the connect string and return only the part that matched.
    pub fn validated_connect_string(&self) -> Result<String> {
        let pattern = Regex::new(&self.connect_regex)?;
        let candidate = self.connect_string.trim();
        match pattern.find(candidate) {
            Some(m) => Ok(m.as_str().to_string()),
            None => Err(Error::InvalidConnectString {
                message: format!("'{}' does not match the connect pattern", candidate),
            }),
        }
    }
}

/// OUT cursor placeholders bound on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    pub out_cursors: Vec<String>,
}

/// Result fetching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultConfig {
    pub fetch_all: FetchParams,
}

/// Parameters for fetching every row of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchParams {
    /// Rows to skip before collecting.
    pub skip: usize,
    /// Maximum rows to collect; -1 means all.
    pub max_rows: i64,
}

impl Default for FetchParams {
    fn default() -> Self {
        Self {
            skip: 0,
            max_rows: -1,
        }
    }
}

impl FetchParams {
    /// Row limit, or `None` for unlimited.
    pub fn limit(&self) -> Option<usize> {
        usize::try_from(self.max_rows).ok()
    }
}
