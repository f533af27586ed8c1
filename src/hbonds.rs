use indicatif::{ProgressBar, ProgressStyle};

use crate::structure::{angle_between, displacement, Coordinate, SimBox, Topology};
use crate::trajectory::TrajectoryData;

/// Hydrogen bond detected in a single frame, given by atom indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HBond {
    pub donor: usize,
    pub hydrogen: usize,
    pub acceptor: usize,
}

impl HBond {
    pub fn new(donor: usize, hydrogen: usize, acceptor: usize) -> Self {
        Self {
            donor,
            hydrogen,
            acceptor,
        }
    }
}

/// Wernet-Nilsson hydrogen bond criterion.
///
/// A donor-hydrogen-acceptor triplet forms a hydrogen bond if
/// `r_DA < distance_cutoff - angle_const * theta^2` and `theta < angle_cutoff`,
/// where `theta` is the H-D-A angle in degrees (vertex at the donor).
#[derive(Debug, Clone, Copy)]
pub struct WernetNilsson {
    /// Maximum donor-acceptor distance at zero angle (Angstrom). Default 3.3.
    pub distance_cutoff: f64,
    /// Quadratic angular penalty (Angstrom per degree squared). Default 0.00044.
    pub angle_const: f64,
    /// Maximum H-D-A angle (degrees). Default 45.
    pub angle_cutoff: f64,
    /// Use the minimum image convention if the trajectory has a box. Default true.
    pub periodic: bool,
}

impl Default for WernetNilsson {
    fn default() -> Self {
        Self {
            distance_cutoff: 3.3,
            angle_const: 0.00044,
            angle_cutoff: 45.0,
            periodic: true,
        }
    }
}

impl WernetNilsson {
    /// Candidate triplets: every donor-hydrogen pair combined with every acceptor
    /// other than the donor itself. Water is never a donor nor an acceptor.
    ///
    /// Sorted by donor, hydrogen and acceptor index.
    pub fn candidate_triplets(topology: &Topology) -> Vec<HBond> {
        let outside_water =
            |atom: usize| !topology.residues[topology.atoms[atom].residue].is_water();

        let acceptors: Vec<usize> = topology
            .atoms
            .iter()
            .filter(|atom| atom.element.is_polar())
            .map(|atom| atom.index)
            .filter(|&atom| outside_water(atom))
            .collect();

        let mut donor_hydrogens: Vec<(usize, usize)> = topology
            .xh_bonds
            .iter()
            .copied()
            .filter(|&(donor, _)| topology.atoms[donor].element.is_polar() && outside_water(donor))
            .collect();
        donor_hydrogens.sort_unstable();

        donor_hydrogens
            .iter()
            .flat_map(|&(donor, hydrogen)| {
                acceptors
                    .iter()
                    .filter(move |&&acceptor| acceptor != donor)
                    .map(move |&acceptor| HBond::new(donor, hydrogen, acceptor))
            })
            .collect()
    }

    /// Test a single triplet against the criterion.
    pub fn is_hbond(
        &self,
        frame: &[Coordinate],
        triplet: &HBond,
        simbox: Option<&SimBox>,
    ) -> bool {
        let donor = &frame[triplet.donor];
        let da = displacement(donor, &frame[triplet.acceptor], simbox);
        let distance = da.norm();
        if distance >= self.distance_cutoff {
            return false;
        }

        let dh = displacement(donor, &frame[triplet.hydrogen], simbox);
        let angle = match angle_between(&dh, &da) {
            Some(a) => a,
            None => return false,
        };

        angle < self.angle_cutoff
            && distance < self.distance_cutoff - self.angle_const * angle * angle
    }

    /// Detect hydrogen bonds in every frame of the trajectory.
    ///
    /// # Returns
    /// One vector of hydrogen bonds per frame, each ordered by donor, hydrogen and acceptor
    pub fn compute(&self, data: &TrajectoryData) -> Result<Vec<Vec<HBond>>, String> {
        let triplets = Self::candidate_triplets(&data.topology);
        let simbox = if self.periodic {
            data.simbox.as_ref()
        } else {
            None
        };

        let pb = ProgressBar::new(data.n_frames() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} frames ({percent}%) | ETA: {eta}")
                .map_err(|e| format!("Invalid progress bar template: {}", e))?
                .progress_chars("#>-"),
        );
        pb.set_message("Detecting hydrogen bonds");

        let mut hbond_traj = Vec::with_capacity(data.n_frames());
        for (frame_idx, frame) in data.frames.iter().enumerate() {
            if frame.len() != data.n_atoms() {
                return Err(format!(
                    "Frame {} contains {} atoms but the topology contains {}",
                    frame_idx,
                    frame.len(),
                    data.n_atoms()
                ));
            }

            let hbonds: Vec<HBond> = triplets
                .iter()
                .filter(|triplet| self.is_hbond(frame, triplet, simbox))
                .copied()
                .collect();
            hbond_traj.push(hbonds);

            pb.inc(1);
        }

        pb.finish_with_message("Detection complete");
        Ok(hbond_traj)
    }
}

/// Make sure `protein_chain` names a chain of the topology.
pub fn validate_protein_chain(topology: &Topology, protein_chain: usize) -> Result<(), String> {
    if protein_chain >= topology.n_chains() {
        return Err(format!(
            "Protein chain {} does not exist: the system has {} chains (0-{})",
            protein_chain,
            topology.n_chains(),
            topology.n_chains().saturating_sub(1)
        ));
    }
    Ok(())
}

/// Check whether the hydrogen bond connects the protein chain with a different chain.
///
/// Bonds with both the donor and the acceptor inside the protein chain, or with
/// neither of them inside it, are rejected.
pub fn check_hbond(
    topology: &Topology,
    hbond: &HBond,
    protein_chain: usize,
) -> Result<bool, String> {
    let donor_chain = topology.chain_of_atom(hbond.donor)?;
    let acceptor_chain = topology.chain_of_atom(hbond.acceptor)?;

    let protein_donor = donor_chain == protein_chain && acceptor_chain != protein_chain;
    let protein_acceptor = donor_chain != protein_chain && acceptor_chain == protein_chain;

    Ok(protein_donor || protein_acceptor)
}

/// Keep only the inter-chain hydrogen bonds of a single frame, preserving their order.
pub fn filter_hbonds_for_frame(
    hbonds: &[HBond],
    topology: &Topology,
    protein_chain: usize,
) -> Result<Vec<HBond>, String> {
    let mut filtered = Vec::new();
    for hbond in hbonds {
        if check_hbond(topology, hbond, protein_chain)? {
            filtered.push(*hbond);
        }
    }

    Ok(filtered)
}

/// Filter every frame of the trajectory. The number and order of frames is preserved.
pub fn process_hbonds(
    hbond_traj: &[Vec<HBond>],
    topology: &Topology,
    protein_chain: usize,
) -> Result<Vec<Vec<HBond>>, String> {
    hbond_traj
        .iter()
        .map(|hbonds| filter_hbonds_for_frame(hbonds, topology, protein_chain))
        .collect()
}
