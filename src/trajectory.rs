use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::hbonds::{HBond, WernetNilsson};
use crate::structure::{Coordinate, Element, FrameData, SimBox, Topology};

/// Topology plus coordinates of every frame of a trajectory
#[derive(Debug, Clone)]
pub struct TrajectoryData {
    pub topology: Topology,
    pub frames: Vec<FrameData>,
    /// Periodic cell from the CRYST1 record.
    /// `None` if the record is missing or holds the 1 x 1 x 1 placeholder.
    pub simbox: Option<SimBox>,
}

impl TrajectoryData {
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn n_atoms(&self) -> usize {
        self.topology.n_atoms()
    }

    /// Remove water and ions, returning the reduced trajectory.
    ///
    /// Indices of the remaining atoms, residues and chains are renumbered.
    pub fn remove_solvent(&self) -> Result<TrajectoryData, String> {
        let keep: Vec<bool> = self
            .topology
            .atoms
            .iter()
            .map(|atom| !self.topology.residues[atom.residue].is_solvent())
            .collect();

        let topology = self.topology.retain_atoms(&keep)?;
        let frames = self
            .frames
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .zip(keep.iter())
                    .filter(|(_, keep)| **keep)
                    .map(|(coordinate, _)| *coordinate)
                    .collect()
            })
            .collect();

        Ok(TrajectoryData {
            topology,
            frames,
            simbox: self.simbox,
        })
    }
}

/// Trait for reading trajectory files and detecting hydrogen bonds in them
pub trait Trajectory {
    /// Read PDB file and extract topology and coordinates of all atoms for each frame
    ///
    /// # Arguments
    /// * `max_frames` - Maximum number of frames to read (None for all frames)
    ///
    /// # Returns
    /// Topology built from the first frame and one coordinate array per frame
    fn read_pdb(&self, max_frames: Option<usize>) -> Result<TrajectoryData, String>;

    /// Read the trajectory and optionally remove water and ions
    ///
    /// Fails if no atoms are left after removing the solvent.
    fn load(
        &self,
        max_frames: Option<usize>,
        strip_solvent: bool,
    ) -> Result<TrajectoryData, String> {
        let data = self.read_pdb(max_frames)?;
        if !strip_solvent {
            return Ok(data);
        }

        let data = data.remove_solvent()?;
        if data.n_atoms() == 0 {
            return Err("No atoms left after removing the solvent".to_string());
        }
        Ok(data)
    }

    /// Load the trajectory, optionally strip the solvent, and detect hydrogen bonds
    ///
    /// # Arguments
    /// * `max_frames` - Maximum number of frames to process (None for all frames)
    /// * `strip_solvent` - Remove water and ions before the detection
    /// * `detector` - Hydrogen bond criterion
    ///
    /// # Returns
    /// The (reduced) trajectory and hydrogen bonds detected in each frame
    fn compute_hbonds(
        &self,
        max_frames: Option<usize>,
        strip_solvent: bool,
        detector: &WernetNilsson,
    ) -> Result<(TrajectoryData, Vec<Vec<HBond>>), String>;
}

/// Implementation of Trajectory trait for PDB files
pub struct PdbTrajectory {
    file_path: String,
}

impl PdbTrajectory {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: file_path.as_ref().to_string_lossy().to_string(),
        }
    }
}

impl Trajectory for PdbTrajectory {
    fn read_pdb(&self, max_frames: Option<usize>) -> Result<TrajectoryData, String> {
        if max_frames == Some(0) {
            return Err("Maximum number of frames must be at least 1".to_string());
        }

        let file = File::open(&self.file_path)
            .map_err(|e| format!("Failed to open PDB file {}: {}", self.file_path, e))?;

        let reader = BufReader::new(file);
        let mut builder = TopologyBuilder::default();
        let mut frames: Vec<FrameData> = Vec::new();
        let mut current_frame = FrameData::new();
        let mut simbox: Option<SimBox> = None;
        let mut cryst1_seen = false;
        let limit_reached =
            |frames: &Vec<FrameData>| max_frames.is_some_and(|max| frames.len() >= max);

        for (line_idx, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(|e| format!("Error reading line: {}", e))?;

            if line.starts_with("ATOM") || line.starts_with("HETATM") {
                let record = match parse_atom_line(&line)
                    .map_err(|e| format!("Line {}: {}", line_idx + 1, e))?
                {
                    Some(r) => r,
                    None => continue, // alternate location
                };

                // topology is built from the first frame only
                if frames.is_empty() {
                    builder.add(&record)?;
                }
                current_frame.push(record.position);
            } else if line.starts_with("TER") {
                if frames.is_empty() {
                    builder.terminate_chain();
                }
            } else if line.starts_with("MODEL") || line.starts_with("END") {
                // MODEL opens, ENDMDL and END close a frame
                if !current_frame.is_empty() {
                    push_frame(&mut frames, std::mem::take(&mut current_frame))?;
                }

                if limit_reached(&frames) {
                    break;
                }
            } else if line.starts_with("CRYST1") && !cryst1_seen {
                simbox =
                    parse_cryst1(&line).map_err(|e| format!("Line {}: {}", line_idx + 1, e))?;
                cryst1_seen = true;
            }
        }

        // handle last frame if file doesn't end with ENDMDL or END
        if !current_frame.is_empty() && !limit_reached(&frames) {
            push_frame(&mut frames, current_frame)?;
        }

        if frames.is_empty() {
            return Err(format!("PDB file {} contains no atoms", self.file_path));
        }

        let mut topology = builder.finish();
        topology.guess_xh_bonds(&frames[0], simbox.as_ref())?;

        Ok(TrajectoryData {
            topology,
            frames,
            simbox,
        })
    }

    fn compute_hbonds(
        &self,
        max_frames: Option<usize>,
        strip_solvent: bool,
        detector: &WernetNilsson,
    ) -> Result<(TrajectoryData, Vec<Vec<HBond>>), String> {
        let data = self.load(max_frames, strip_solvent)?;
        let hbonds = detector.compute(&data)?;
        Ok((data, hbonds))
    }
}

/// Append a frame, checking that it is consistent with the first one.
fn push_frame(frames: &mut Vec<FrameData>, frame: FrameData) -> Result<(), String> {
    if let Some(first) = frames.first() {
        if first.len() != frame.len() {
            return Err(format!(
                "Frame {} contains {} atoms but the first frame contains {}",
                frames.len(),
                frame.len(),
                first.len()
            ));
        }
    }

    frames.push(frame);
    Ok(())
}

/// Parsed ATOM/HETATM record
#[derive(Debug, Clone)]
struct AtomRecord {
    name: String,
    residue_name: String,
    chain_id: Option<char>,
    residue_number: i32,
    insertion_code: Option<char>,
    element: Element,
    position: Coordinate,
}

/// Character at a column of a PDB line; blank columns are `None`.
fn column_char(line: &str, idx: usize) -> Option<char> {
    line.get(idx..idx + 1)
        .and_then(|s| s.chars().next())
        .filter(|c| !c.is_whitespace())
}

/// Parse a single ATOM or HETATM line.
///
/// Returns `Ok(None)` for alternate locations other than the first one.
fn parse_atom_line(line: &str) -> Result<Option<AtomRecord>, String> {
    // PDB format: columns 30-38 = x, 38-46 = y, 46-54 = z
    if line.len() < 54 {
        return Err(format!("Atom line is too short: {}", line));
    }

    if let Some(alt_loc) = column_char(line, 16) {
        if alt_loc != 'A' {
            return Ok(None);
        }
    }

    let name = line.get(12..16).unwrap_or("").trim().to_string();
    if name.is_empty() {
        return Err(format!("Missing atom name: {}", line));
    }

    let residue_name = line.get(17..20).unwrap_or("").trim().to_string();

    let residue_str = line.get(22..26).unwrap_or("").trim();
    let residue_number = residue_str
        .parse::<i32>()
        .map_err(|e| format!("Failed to parse residue number '{}': {}", residue_str, e))?;

    let mut xyz = [0.0; 3];
    for (i, value) in xyz.iter_mut().enumerate() {
        let start = 30 + 8 * i;
        let coord_str = line.get(start..start + 8).unwrap_or("").trim();
        *value = coord_str
            .parse::<f64>()
            .map_err(|e| format!("Failed to parse coordinate '{}': {}", coord_str, e))?;
    }

    let element = line
        .get(76..78)
        .and_then(Element::from_symbol)
        .unwrap_or_else(|| Element::guess_from_name(&name));

    Ok(Some(AtomRecord {
        name,
        residue_name,
        chain_id: column_char(line, 21),
        residue_number,
        insertion_code: column_char(line, 26),
        element,
        position: Coordinate::new(xyz[0], xyz[1], xyz[2]),
    }))
}

/// Parse the periodic cell from a CRYST1 line.
///
/// Columns 7-33 hold a, b, c and columns 34-54 hold alpha, beta, gamma.
/// Missing angles default to 90 degrees.
fn parse_cryst1(line: &str) -> Result<Option<SimBox>, String> {
    let mut lengths = [0.0; 3];
    for (i, value) in lengths.iter_mut().enumerate() {
        let start = 6 + 9 * i;
        let length_str = line.get(start..start + 9).unwrap_or("").trim();
        *value = length_str
            .parse::<f64>()
            .map_err(|e| format!("Failed to parse box length '{}': {}", length_str, e))?;
    }

    let mut angles = [90.0; 3];
    for (i, value) in angles.iter_mut().enumerate() {
        let start = 33 + 7 * i;
        let angle_str = line.get(start..start + 7).unwrap_or("").trim();
        if angle_str.is_empty() {
            continue;
        }
        *value = angle_str
            .parse::<f64>()
            .map_err(|e| format!("Failed to parse box angle '{}': {}", angle_str, e))?;
    }

    SimBox::from_cell(lengths, angles)
}

/// Builds the topology from the atom records of the first frame
#[derive(Debug, Default)]
struct TopologyBuilder {
    topology: Topology,
    chain_terminated: bool,
    current_chain_id: Option<char>,
    current_residue: Option<(i32, Option<char>, String)>,
}

impl TopologyBuilder {
    fn add(&mut self, record: &AtomRecord) -> Result<(), String> {
        let new_chain = self.topology.chains.is_empty()
            || self.chain_terminated
            || self.current_chain_id != record.chain_id;

        if new_chain {
            self.topology.push_chain(record.chain_id);
            self.current_chain_id = record.chain_id;
            self.current_residue = None;
            self.chain_terminated = false;
        }

        let residue_key = (
            record.residue_number,
            record.insertion_code,
            record.residue_name.clone(),
        );
        if self.current_residue.as_ref() != Some(&residue_key) {
            self.topology.push_residue(
                &record.residue_name,
                record.residue_number,
                record.insertion_code,
            )?;
            self.current_residue = Some(residue_key);
        }

        self.topology.push_atom(&record.name, record.element)?;
        Ok(())
    }

    fn terminate_chain(&mut self) {
        if !self.topology.chains.is_empty() {
            self.chain_terminated = true;
        }
    }

    fn finish(self) -> Topology {
        self.topology
    }
}
