pub mod assembler;
pub mod correspondence;
pub mod engine;
pub mod geo;
pub mod notice;
pub mod overlap;
pub mod progress;
pub mod runner;
pub mod settings;
pub mod stops;

pub use assembler::{anchor_from_members, assemble, AssembleError};
pub use correspondence::match_shapes;
pub use engine::{
    effective_tolerance, reconcile_route, DirectionOutcome, OverlapResult, RouteOutcome,
};
pub use notice::{NoticeContainer, NoticeSeverity, ReconcileNotice};
pub use overlap::{overlap, overlap_profile};
pub use progress::{NoOpProgressHandler, ProgressHandler};
pub use runner::ReconcileRunner;
pub use settings::{OverlapGrade, ReconcileSettings};
pub use stops::{nearest_platforms, StopDistance};

pub use reconcile_model::{
    CommunityDirection, Coordinate, CorrespondenceMap, ProviderPattern, ReconcileInput,
    RouteInput, Segment, Shape, TransportMode,
};
