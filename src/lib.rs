//! Parameter binding for Oracle stored procedure calls
//!
//! Turns a map of named, loosely typed parameters into the scalar, array and
//! collection binds a procedural Oracle client expects: which parameters are
//! OUT variables, which wire type each buffer gets, how long buffers are, and
//! what the values look like when handed over.
//!
//! Parameters are plain values, arrays, or `{length, type, value}`
//! descriptors. Names containing a configured OUT suffix (`_outvar`,
//! `_retval` by default) must use the descriptor form and are read back after
//! execution.
//!
//! # Example
//!
//! ```
//! use oracle_procbind::memory::MemoryDriver;
//! use oracle_procbind::{BindingOrchestrator, BindingsConfig, ParameterMap, Result};
//!
//! fn main() -> Result<()> {
//!     let orchestrator = BindingOrchestrator::from_config(&BindingsConfig::default())?;
//!
//!     let params: ParameterMap = serde_json::from_str(
//!         r#"{
//!             "url": "http://example.com",
//!             "ids": [1, 2, 3],
//!             "return_outvar": {"length": 8, "type": "int", "value": null}
//!         }"#,
//!     )?;
//!
//!     let mut driver = MemoryDriver::new();
//!     let mut stmt = driver.statement("BEGIN :return_outvar := app.pkg.save(:url, :ids); END;");
//!     let bound = orchestrator.bind_all(&mut driver, Some(&mut stmt), &params)?;
//!
//!     assert!(bound.results().values().all(|ok| *ok));
//!     Ok(())
//! }
//! ```

pub mod bind;
pub mod config;
pub mod constants;
pub mod driver;
pub mod error;
pub mod memory;
pub mod payload;
pub mod procedure;
pub mod row;
pub mod statement;

// Re-export main types
pub use bind::{
    merge, BindMode, BindValue, BindingOrchestrator, Bindings, BoundParameter, BoundParameters,
    CustomType, LengthResolver, LengthSpec, ParamValue, ParameterClassifier, ParameterMap,
    ShapedValue, TypeResolver, ValueShaper, WireType,
};
pub use config::{
    BindingsConfig, ConnectFlavor, ConnectionConfig, DbalConfig, FetchParams, NullArrayPolicy,
};
pub use driver::{BindDriver, Connector, DriverError, Session};
pub use error::{Error, Result};
pub use payload::{validate_payload, PayloadValidator};
pub use procedure::{Dbal, Procedure, RunOutput};
pub use row::{Column, ColumnInfo, FetchResult, Row};
pub use statement::{SqlKind, StatementClassifier};
