#![doc(issue_tracker_base_url = "https://github.com/txgate/txgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub use txgate_core::*;
pub use txgate_link::*;
pub use txgate_wire::*;
