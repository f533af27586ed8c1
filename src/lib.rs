pub mod hbonds;
pub mod report;
pub mod structure;
pub mod trajectory;

#[cfg(feature = "python")]
pub mod python_bindings;

// Re-export commonly used types and traits
pub use hbonds::{
    check_hbond, filter_hbonds_for_frame, process_hbonds, validate_protein_chain, HBond,
    WernetNilsson,
};
pub use report::{
    print_chains, print_hbonds, print_summary, save_counts_to_csv, save_hbonds_to_csv, summarize,
    HBondSummary,
};
pub use structure::{Atom, Chain, Coordinate, Element, FrameData, Residue, SimBox, Topology};
pub use trajectory::{PdbTrajectory, Trajectory, TrajectoryData};
