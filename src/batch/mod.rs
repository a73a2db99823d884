//! Batch payload construction, submission and result interpretation
//!
//! ## Key Components
//!
//! - [`BatchPayloadBuilder`] - renders [`ItemSpec`]s into a [`BatchRequest`], order preserved
//! - [`BatchSubmitter`] - POSTs a batch (or a single rendered item) through a transport
//! - [`ResponseAggregator`] - classifies each `api_response_list` entry positionally
//!
//! ## Example
//!
//! ```rust,ignore
//! let batch = builder.build(&specs)?;
//! let response = BatchSubmitter::new(&transport, "/api/nutanix/v3/batch")
//!     .submit(&batch)
//!     .await?;
//! let aggregation = ResponseAggregator::default().aggregate(&response)?;
//! ```

mod aggregate;
pub mod items;
mod payload;
mod submit;

pub use aggregate::{
    Aggregation, BatchResponseItem, ItemOutcome, OutcomeSummary, ResponseAggregator,
};
pub use items::{CloneItem, CloneTemplate, ImageCreate, ImageType, VmCreate};
pub use payload::{
    ActionOnFailure, BatchDocument, BatchPayloadBuilder, BatchRequest, ExecutionOrder, ItemSpec,
    PayloadSettings, RenderedItem,
};
pub use submit::BatchSubmitter;
