//! # Frontier
//!
//! $$
//! \mathcal F = \bigl\{(\lfloor\mu_p\rfloor_d,\ \min \sigma_p)\bigr\}_{\mathbf w \in \Delta_K}
//! $$
//!
//! Discrete efficient frontier by exhaustive search over weight compositions.

pub mod compositions;
pub mod search;
pub mod types;

pub use compositions::count_compositions;
pub use compositions::Compositions;
pub use search::search;
pub use search::FrontierSearch;
pub use types::quantize_return;
pub use types::Frontier;
pub use types::FrontierConfig;
pub use types::FrontierEntry;
