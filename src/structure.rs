use std::fmt;

use nalgebra::{Matrix3, Vector3};

/// Residue names of water models
const WATER_NAMES: &[&str] = &[
    "HOH", "WAT", "SOL", "H2O", "DOD", "TIP", "TIP2", "TIP3", "TIP4", "TIP5", "TIP3P", "TIP4P",
    "TIP5P", "T3P", "T4P", "T5P", "TP3", "TP4", "TP5", "SPC", "SPCE", "W", "W1",
];

/// Residue names of ions and small solvent species removed together with water
const ION_NAMES: &[&str] = &[
    "NA", "NA+", "Na+", "SOD", "K", "K+", "POT", "CL", "CL-", "Cl-", "CLA", "MG", "MG2", "CA",
    "CA+2", "CAL", "ZN", "ZN2", "LI", "LIT", "RB", "CS", "CES", "BR", "IOD", "F", "MN", "FE",
    "FE2", "CU", "NI", "CO", "CD", "SR", "BA", "SO4", "PO4", "NH4", "ION",
];

/// Maximum X-H covalent bond length (Angstrom) used when guessing bonds to hydrogens
pub const MAX_XH_BOND_LENGTH: f64 = 1.3;

/// 3D coordinate vector
pub type Coordinate = Vector3<f64>;

/// Periodic simulation cell given by its box vectors (columns of `matrix`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimBox {
    matrix: Matrix3<f64>,
    inverse: Matrix3<f64>,
    orthorhombic: bool,
}

impl SimBox {
    /// Build the cell from lengths a, b, c (Angstrom) and angles alpha, beta, gamma (degrees).
    ///
    /// Returns `Ok(None)` for cells that do not describe a periodic system:
    /// the 1 x 1 x 1 placeholder written for NMR and cryo-EM models and
    /// cells with a zero length.
    pub fn from_cell(lengths: [f64; 3], angles: [f64; 3]) -> Result<Option<SimBox>, String> {
        let [a, b, c] = lengths;
        let zero_length = lengths.iter().any(|&l| l <= 0.0);
        let unit_placeholder = lengths.iter().all(|&l| (l - 1.0).abs() < 1e-6);
        if zero_length || unit_placeholder {
            return Ok(None);
        }

        let orthorhombic = angles.iter().all(|&angle| (angle - 90.0).abs() < 1e-3);
        let [cos_alpha, cos_beta, cos_gamma] = angles.map(|angle| angle.to_radians().cos());
        let sin_gamma = angles[2].to_radians().sin();

        let (b_vec, c_vec) = if orthorhombic {
            (Vector3::new(0.0, b, 0.0), Vector3::new(0.0, 0.0, c))
        } else {
            if sin_gamma.abs() < 1e-6 {
                return Err(format!("Invalid cell angle gamma {}", angles[2]));
            }
            let cy = (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
            let cz_squared = 1.0 - cos_beta * cos_beta - cy * cy;
            if cz_squared <= 0.0 {
                return Err(format!(
                    "Cell angles {} {} {} do not describe a valid cell",
                    angles[0], angles[1], angles[2]
                ));
            }
            (
                Vector3::new(b * cos_gamma, b * sin_gamma, 0.0),
                Vector3::new(c * cos_beta, c * cy, c * cz_squared.sqrt()),
            )
        };

        let matrix = Matrix3::from_columns(&[Vector3::new(a, 0.0, 0.0), b_vec, c_vec]);
        let inverse = matrix
            .try_inverse()
            .ok_or_else(|| "Simulation box matrix is singular".to_string())?;

        Ok(Some(SimBox {
            matrix,
            inverse,
            orthorhombic,
        }))
    }

    /// Box vectors a, b and c as columns.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn is_orthorhombic(&self) -> bool {
        self.orthorhombic
    }

    /// Shortest periodic image of the displacement `d`.
    pub fn shortest_image(&self, d: &Coordinate) -> Coordinate {
        let fractional = self.inverse * d;
        let wrapped = self.matrix * fractional.map(|f| f - f.round());
        if self.orthorhombic {
            return wrapped;
        }

        // rounding fractional coordinates is not enough in skewed cells;
        // check the neighbouring images as well
        let mut best = wrapped;
        for i in -1..=1 {
            for j in -1..=1 {
                for k in -1..=1 {
                    let shift = Vector3::new(i as f64, j as f64, k as f64);
                    let candidate = wrapped + self.matrix * shift;
                    if candidate.norm_squared() < best.norm_squared() {
                        best = candidate;
                    }
                }
            }
        }
        best
    }
}

/// Vector pointing from `from` to `to`, using the minimum image convention
/// if a simulation box is provided.
pub fn displacement(from: &Coordinate, to: &Coordinate, simbox: Option<&SimBox>) -> Coordinate {
    let d = to - from;
    match simbox {
        Some(simbox) => simbox.shortest_image(&d),
        None => d,
    }
}

/// Angle between two vectors in degrees. `None` if either vector has zero length.
pub fn angle_between(u: &Coordinate, v: &Coordinate) -> Option<f64> {
    if u.norm() == 0.0 || v.norm() == 0.0 {
        return None;
    }
    Some(u.angle(v).to_degrees())
}

/// Chemical element of an atom, as far as the hydrogen bond analysis cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Hydrogen,
    Carbon,
    Nitrogen,
    Oxygen,
    Phosphorus,
    Sulfur,
    Other,
}

impl Element {
    /// Element from a symbol such as `N`, `O` or `Cl` (case-insensitive).
    pub fn from_symbol(symbol: &str) -> Option<Element> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return None;
        }

        let element = match symbol.to_ascii_uppercase().as_str() {
            "H" | "D" => Element::Hydrogen,
            "C" => Element::Carbon,
            "N" => Element::Nitrogen,
            "O" => Element::Oxygen,
            "P" => Element::Phosphorus,
            "S" => Element::Sulfur,
            _ => Element::Other,
        };
        Some(element)
    }

    /// Guess the element from a PDB atom name (`N`, `CA`, `1HB`, `HO5'`, ...).
    ///
    /// Only the first letter is considered, so `CA` is carbon. Ions are
    /// usually removed with the solvent and do not need to be told apart.
    pub fn guess_from_name(name: &str) -> Element {
        name.chars()
            .find(|c| c.is_ascii_alphabetic())
            .and_then(|c| Element::from_symbol(&c.to_string()))
            .unwrap_or(Element::Other)
    }

    /// Nitrogen and oxygen can act as hydrogen bond donors and acceptors.
    pub fn is_polar(&self) -> bool {
        matches!(self, Element::Nitrogen | Element::Oxygen)
    }

    pub fn is_heavy(&self) -> bool {
        !matches!(self, Element::Hydrogen | Element::Other)
    }
}

/// Single atom of the topology
#[derive(Debug, Clone)]
pub struct Atom {
    pub index: usize,
    pub name: String,
    pub element: Element,
    pub residue: usize,
}

/// Single residue of the topology
#[derive(Debug, Clone)]
pub struct Residue {
    pub index: usize,
    pub name: String,
    pub number: i32,
    pub insertion_code: Option<char>,
    pub chain: usize,
    pub atoms: Vec<usize>,
}

impl Residue {
    pub fn is_water(&self) -> bool {
        WATER_NAMES.contains(&self.name.as_str())
    }

    /// Water or ion.
    pub fn is_solvent(&self) -> bool {
        self.is_water() || ION_NAMES.contains(&self.name.as_str())
    }
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.number)?;
        if let Some(code) = self.insertion_code {
            write!(f, "{}", code)?;
        }
        Ok(())
    }
}

/// Single chain of the topology
#[derive(Debug, Clone)]
pub struct Chain {
    pub index: usize,
    /// Chain identifier from the PDB file, if any
    pub id: Option<char>,
    pub residues: Vec<usize>,
}

/// Static description of chains, residues and atoms of the system.
///
/// Atoms, residues and chains are indexed from 0 in file order.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub atoms: Vec<Atom>,
    pub residues: Vec<Residue>,
    pub chains: Vec<Chain>,
    /// Covalent bonds between a heavy atom (first) and a hydrogen (second)
    pub xh_bonds: Vec<(usize, usize)>,
}

impl Topology {
    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn n_chains(&self) -> usize {
        self.chains.len()
    }

    pub fn atom(&self, index: usize) -> Result<&Atom, String> {
        self.atoms.get(index).ok_or_else(|| {
            format!(
                "Atom index {} is out of range (topology contains {} atoms)",
                index,
                self.atoms.len()
            )
        })
    }

    pub fn residue_of_atom(&self, index: usize) -> Result<&Residue, String> {
        let atom = self.atom(index)?;
        self.residues
            .get(atom.residue)
            .ok_or_else(|| format!("Atom {} refers to a nonexistent residue {}", index, atom.residue))
    }

    /// Index of the chain the atom belongs to.
    pub fn chain_of_atom(&self, index: usize) -> Result<usize, String> {
        Ok(self.residue_of_atom(index)?.chain)
    }

    /// Human-readable atom descriptor, e.g. `ARG12-NH1`.
    pub fn atom_label(&self, index: usize) -> Result<String, String> {
        let atom = self.atom(index)?;
        let residue = self.residue_of_atom(index)?;
        Ok(format!("{}-{}", residue, atom.name))
    }

    /// Append an atom to the last residue of the topology.
    pub(crate) fn push_atom(&mut self, name: &str, element: Element) -> Result<usize, String> {
        let residue_index = self
            .residues
            .len()
            .checked_sub(1)
            .ok_or_else(|| format!("Cannot add atom {} before any residue", name))?;

        let index = self.atoms.len();
        self.atoms.push(Atom {
            index,
            name: name.to_string(),
            element,
            residue: residue_index,
        });
        self.residues[residue_index].atoms.push(index);
        Ok(index)
    }

    /// Append an empty residue to the last chain of the topology.
    pub(crate) fn push_residue(
        &mut self,
        name: &str,
        number: i32,
        insertion_code: Option<char>,
    ) -> Result<usize, String> {
        let chain_index = self
            .chains
            .len()
            .checked_sub(1)
            .ok_or_else(|| format!("Cannot add residue {}{} before any chain", name, number))?;

        let index = self.residues.len();
        self.residues.push(Residue {
            index,
            name: name.to_string(),
            number,
            insertion_code,
            chain: chain_index,
            atoms: Vec::new(),
        });
        self.chains[chain_index].residues.push(index);
        Ok(index)
    }

    /// Append an empty chain to the topology.
    pub(crate) fn push_chain(&mut self, id: Option<char>) -> usize {
        let index = self.chains.len();
        self.chains.push(Chain {
            index,
            id,
            residues: Vec::new(),
        });
        index
    }

    /// Assign every hydrogen to the closest heavy atom of its own residue
    /// that lies within `MAX_XH_BOND_LENGTH`.
    ///
    /// Distances follow the minimum image convention when a box is given,
    /// so residues split over the periodic boundary keep their bonds.
    pub fn guess_xh_bonds(
        &mut self,
        positions: &[Coordinate],
        simbox: Option<&SimBox>,
    ) -> Result<(), String> {
        if positions.len() != self.atoms.len() {
            return Err(format!(
                "Cannot guess bonds: got {} positions for {} atoms",
                positions.len(),
                self.atoms.len()
            ));
        }

        let mut bonds = Vec::new();
        for residue in &self.residues {
            for &hydrogen in &residue.atoms {
                if self.atoms[hydrogen].element != Element::Hydrogen {
                    continue;
                }

                let closest = residue
                    .atoms
                    .iter()
                    .copied()
                    .filter(|&heavy| self.atoms[heavy].element.is_heavy())
                    .map(|heavy| {
                        let d = displacement(&positions[heavy], &positions[hydrogen], simbox);
                        (heavy, d.norm())
                    })
                    .filter(|(_, distance)| *distance <= MAX_XH_BOND_LENGTH)
                    .min_by(|a, b| a.1.total_cmp(&b.1));

                if let Some((heavy, _)) = closest {
                    bonds.push((heavy, hydrogen));
                }
            }
        }

        self.xh_bonds = bonds;
        Ok(())
    }

    /// Build a new topology containing only atoms for which `keep` is true.
    ///
    /// Atoms, residues and chains are renumbered contiguously. Residues and
    /// chains left without atoms are dropped, and so are bonds to removed atoms.
    pub fn retain_atoms(&self, keep: &[bool]) -> Result<Topology, String> {
        if keep.len() != self.atoms.len() {
            return Err(format!(
                "Atom mask has {} entries but topology contains {} atoms",
                keep.len(),
                self.atoms.len()
            ));
        }

        let mut reduced = Topology::default();
        let mut new_indices: Vec<Option<usize>> = vec![None; self.atoms.len()];

        for chain in &self.chains {
            let mut chain_created = false;

            for &residue_index in &chain.residues {
                let residue = &self.residues[residue_index];
                let kept: Vec<usize> = residue.atoms.iter().copied().filter(|&a| keep[a]).collect();
                if kept.is_empty() {
                    continue;
                }

                if !chain_created {
                    reduced.push_chain(chain.id);
                    chain_created = true;
                }
                reduced.push_residue(&residue.name, residue.number, residue.insertion_code)?;

                for old in kept {
                    let atom = &self.atoms[old];
                    new_indices[old] = Some(reduced.push_atom(&atom.name, atom.element)?);
                }
            }
        }

        reduced.xh_bonds = self
            .xh_bonds
            .iter()
            .filter_map(|&(heavy, hydrogen)| Some((new_indices[heavy]?, new_indices[hydrogen]?)))
            .collect();

        Ok(reduced)
    }
}

/// Frame data: one coordinate per topology atom, in topology order
pub type FrameData = Vec<Coordinate>;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two chains: chain 0 holds residue SER1 (N, H, OG), chain 1 holds DG1 (O6) and HOH2 (O).
    pub(crate) fn two_chain_topology() -> Topology {
        let mut top = Topology::default();
        top.push_chain(Some('A'));
        top.push_residue("SER", 1, None).unwrap();
        top.push_atom("N", Element::Nitrogen).unwrap();
        top.push_atom("H", Element::Hydrogen).unwrap();
        top.push_atom("OG", Element::Oxygen).unwrap();
        top.push_chain(Some('B'));
        top.push_residue("DG", 1, None).unwrap();
        top.push_atom("O6", Element::Oxygen).unwrap();
        top.push_residue("HOH", 2, None).unwrap();
        top.push_atom("O", Element::Oxygen).unwrap();
        top
    }

    #[test]
    fn test_displacement() {
        let c1 = Coordinate::new(0.0, 0.0, 0.0);
        let c2 = Coordinate::new(3.0, 4.0, 0.0);
        assert_eq!(displacement(&c1, &c2, None).norm(), 5.0);
    }

    #[test]
    fn test_minimum_image() {
        let simbox = SimBox::from_cell([30.0, 30.0, 30.0], [90.0, 90.0, 90.0])
            .unwrap()
            .unwrap();
        assert!(simbox.is_orthorhombic());

        let c1 = Coordinate::new(1.0, 0.0, 0.0);
        let c2 = Coordinate::new(29.0, 0.0, 0.0);
        let v = displacement(&c1, &c2, Some(&simbox));
        assert!((v.x + 2.0).abs() < 1e-9);
        assert!((displacement(&c1, &c2, None).x - 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_simbox_placeholder() {
        assert_eq!(SimBox::from_cell([1.0, 1.0, 1.0], [90.0, 90.0, 90.0]), Ok(None));
        assert_eq!(SimBox::from_cell([0.0, 0.0, 0.0], [90.0, 90.0, 90.0]), Ok(None));
        assert!(SimBox::from_cell([20.0, 20.0, 20.0], [90.0, 90.0, 180.0]).is_err());
        assert!(SimBox::from_cell([20.0, 20.0, 20.0], [10.0, 120.0, 90.0]).is_err());
    }

    #[test]
    fn test_minimum_image_triclinic() {
        let simbox = SimBox::from_cell([20.0, 20.0, 20.0], [60.0, 60.0, 90.0])
            .unwrap()
            .unwrap();
        assert!(!simbox.is_orthorhombic());

        let c = simbox.matrix().column(2).into_owned();
        assert!((c.norm() - 20.0).abs() < 1e-9);

        // the nearest lattice points to (0, 0, 17.1) are images of c, about 14.45 away
        let origin = Coordinate::zeros();
        let v = displacement(&origin, &Coordinate::new(0.0, 0.0, 17.1), Some(&simbox));
        assert!((v.norm() - 14.448).abs() < 1e-3);

        // a point just next to an image of the origin
        let near = c + Coordinate::new(-2.9, 0.0, 0.0);
        let v = displacement(&origin, &near, Some(&simbox));
        assert!((v - Coordinate::new(-2.9, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_angle() {
        let a = Coordinate::new(1.0, 0.0, 0.0);
        let b = Coordinate::new(0.0, 2.0, 0.0);
        assert!((angle_between(&a, &b).unwrap() - 90.0).abs() < 1e-9);
        assert!(angle_between(&a, &a).unwrap().abs() < 1e-6);
        assert!(angle_between(&a, &Coordinate::zeros()).is_none());
    }

    #[test]
    fn test_element_guess() {
        assert_eq!(Element::guess_from_name("N"), Element::Nitrogen);
        assert_eq!(Element::guess_from_name("CA"), Element::Carbon);
        assert_eq!(Element::guess_from_name("1HB"), Element::Hydrogen);
        assert_eq!(Element::guess_from_name("O5'"), Element::Oxygen);
        assert_eq!(Element::from_symbol("Cl"), Some(Element::Other));
        assert_eq!(Element::from_symbol("  "), None);
    }

    #[test]
    fn test_labels_and_chains() {
        let top = two_chain_topology();
        assert_eq!(top.n_chains(), 2);
        assert_eq!(top.atom_label(1).unwrap(), "SER1-H");
        assert_eq!(top.atom_label(3).unwrap(), "DG1-O6");
        assert_eq!(top.chain_of_atom(2).unwrap(), 0);
        assert_eq!(top.chain_of_atom(4).unwrap(), 1);
        assert!(top.chain_of_atom(5).is_err());
    }

    #[test]
    fn test_guess_xh_bonds() {
        let mut top = two_chain_topology();
        let positions = vec![
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(1.0, 0.0, 0.0),
            Coordinate::new(-1.4, 0.0, 0.0),
            Coordinate::new(10.0, 0.0, 0.0),
            Coordinate::new(20.0, 0.0, 0.0),
        ];
        top.guess_xh_bonds(&positions, None).unwrap();
        assert_eq!(top.xh_bonds, vec![(0, 1)]);
        assert!(top.guess_xh_bonds(&positions[..2], None).is_err());
    }

    #[test]
    fn test_guess_xh_bonds_across_boundary() {
        let mut top = two_chain_topology();
        let positions = vec![
            Coordinate::new(0.5, 0.0, 0.0),
            Coordinate::new(29.6, 0.0, 0.0),
            Coordinate::new(5.0, 0.0, 0.0),
            Coordinate::new(10.0, 0.0, 0.0),
            Coordinate::new(20.0, 0.0, 0.0),
        ];
        let simbox = SimBox::from_cell([30.0, 30.0, 30.0], [90.0, 90.0, 90.0])
            .unwrap()
            .unwrap();

        top.guess_xh_bonds(&positions, None).unwrap();
        assert!(top.xh_bonds.is_empty());

        top.guess_xh_bonds(&positions, Some(&simbox)).unwrap();
        assert_eq!(top.xh_bonds, vec![(0, 1)]);
    }

    #[test]
    fn test_retain_atoms() {
        let mut top = two_chain_topology();
        top.xh_bonds = vec![(0, 1)];

        let keep: Vec<bool> = top
            .residues
            .iter()
            .flat_map(|r| {
                let solvent = r.is_solvent();
                r.atoms.iter().map(move |_| !solvent)
            })
            .collect();
        let reduced = top.retain_atoms(&keep).unwrap();

        assert_eq!(reduced.n_atoms(), 4);
        assert_eq!(reduced.residues.len(), 2);
        assert_eq!(reduced.n_chains(), 2);
        assert_eq!(reduced.xh_bonds, vec![(0, 1)]);

        // drop the whole first chain
        let reduced = top.retain_atoms(&[false, false, false, true, false]).unwrap();
        assert_eq!(reduced.n_chains(), 1);
        assert_eq!(reduced.chains[0].id, Some('B'));
        assert_eq!(reduced.atoms[0].name, "O6");
        assert!(reduced.xh_bonds.is_empty());

        assert!(top.retain_atoms(&[true]).is_err());
    }
}
