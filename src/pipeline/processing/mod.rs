// Pure normalization and mapping steps, plus catalog reconciliation

pub mod date;
pub mod reconcile;
pub mod series;
pub mod transform;
