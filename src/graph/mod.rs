//! Distributed CSR graph layer: a single-place [`LocalCsr`], the multi-node
//! [`DistLocalCsr`] built on top of it, and the virtual-host load-balancing table both share.

pub mod api;
pub mod dist_csr;
pub mod local_csr;
pub mod mirror_csr;
pub mod virtual_host;
pub mod wmd;

pub use api::{GraphApi, GraphApiMut};
pub use dist_csr::{DistLocalCsr, DistLocalCsrOwner, EdgeRecord, VertexRecord};
pub use local_csr::{vertex_id, EdgeHandle, HalfEdgeMarker, LocalCsr, VertexMarker, VertexTopologyId};
pub use mirror_csr::{MirrorDistLocalCsr, MirrorDistLocalCsrOwner};
pub use virtual_host::{build_virtual_to_physical, virtual_host_of};
pub use wmd::{parse_edge_list_row, parse_record_row, EdgeKind, RecordRow, VertexKind, WmdEdge, WmdVertex};
