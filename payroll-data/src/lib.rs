//! Loading reference data for the payroll engine.

mod loader;

pub use loader::{TaxBracketLoader, TaxBracketLoaderError, TaxBracketRecord};
