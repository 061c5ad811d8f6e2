// Domain Mapping Registry: test number -> domain -> SG component, plus the
// proof metrics used to interpret raw test values.

pub mod catalog;
pub mod category;
pub mod domain;
pub mod proof_metric;

pub use catalog::*;
pub use category::*;
pub use domain::*;
pub use proof_metric::*;
