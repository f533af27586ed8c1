use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::hbonds::HBond;
use crate::structure::Topology;

/// Statistics of the filtered hydrogen bonds over the whole trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct HBondSummary {
    /// Number of hydrogen bonds in each frame
    pub counts: Vec<usize>,
    pub mean: f64,
    pub min: usize,
    pub max: usize,
}

/// Calculate per-frame counts and their mean, minimum and maximum.
///
/// Returns `None` for a trajectory without frames.
pub fn summarize(filtered: &[Vec<HBond>]) -> Option<HBondSummary> {
    let counts: Vec<usize> = filtered.iter().map(|hbonds| hbonds.len()).collect();
    let min = *counts.iter().min()?;
    let max = *counts.iter().max()?;
    let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;

    Some(HBondSummary {
        counts,
        mean,
        min,
        max,
    })
}

/// Write one line per chain: chain index followed by its residues.
pub fn write_chains<W: Write>(writer: &mut W, topology: &Topology) -> Result<(), String> {
    for chain in &topology.chains {
        let residues = chain
            .residues
            .iter()
            .map(|&r| topology.residues[r].to_string())
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(writer, "{} [{}]", chain.index, residues)
            .map_err(|e| format!("Failed to write chain listing: {}", e))?;
    }
    Ok(())
}

/// Write the hydrogen bonds of the first frame and their number.
pub fn write_hbonds<W: Write>(
    writer: &mut W,
    topology: &Topology,
    filtered: &[Vec<HBond>],
) -> Result<(), String> {
    let first = match filtered.first() {
        Some(f) => f,
        None => {
            writeln!(writer, "The trajectory contains no frames")
                .map_err(|e| format!("Failed to write report: {}", e))?;
            return Ok(());
        }
    };

    writeln!(writer, "List of hydrogen bonds in the first frame:")
        .map_err(|e| format!("Failed to write report: {}", e))?;
    for hbond in first {
        writeln!(
            writer,
            "{} {} {}",
            topology.atom_label(hbond.donor)?,
            topology.atom_label(hbond.hydrogen)?,
            topology.atom_label(hbond.acceptor)?
        )
        .map_err(|e| format!("Failed to write report: {}", e))?;
    }

    writeln!(
        writer,
        "There are {} hydrogen bonds in the first frame between the protein and the other chains",
        first.len()
    )
    .map_err(|e| format!("Failed to write report: {}", e))?;

    Ok(())
}

pub fn write_summary<W: Write>(writer: &mut W, summary: &HBondSummary) -> Result<(), String> {
    writeln!(
        writer,
        "Hydrogen bonds per frame over {} frames: mean {:.2}, min {}, max {}",
        summary.counts.len(),
        summary.mean,
        summary.min,
        summary.max
    )
    .map_err(|e| format!("Failed to write summary: {}", e))
}

pub fn print_chains(topology: &Topology) -> Result<(), String> {
    write_chains(&mut io::stdout().lock(), topology)
}

pub fn print_hbonds(topology: &Topology, filtered: &[Vec<HBond>]) -> Result<(), String> {
    write_hbonds(&mut io::stdout().lock(), topology, filtered)
}

pub fn print_summary(summary: &HBondSummary) -> Result<(), String> {
    write_summary(&mut io::stdout().lock(), summary)
}

/// CSV row describing one hydrogen bond
#[derive(Debug, Serialize)]
struct HBondRow {
    frame: usize,
    donor: usize,
    hydrogen: usize,
    acceptor: usize,
    donor_atom: String,
    hydrogen_atom: String,
    acceptor_atom: String,
}

/// CSV row with the number of hydrogen bonds in one frame
#[derive(Debug, Serialize)]
struct CountRow {
    frame: usize,
    n_hbonds: usize,
}

/// Save every filtered hydrogen bond of every frame to CSV file
pub fn save_hbonds_to_csv(
    topology: &Topology,
    filtered: &[Vec<HBond>],
    output_path: &Path,
) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(output_path)
        .map_err(|e| format!("Failed to create CSV file {}: {}", output_path.display(), e))?;

    for (frame, hbonds) in filtered.iter().enumerate() {
        for hbond in hbonds {
            let row = HBondRow {
                frame,
                donor: hbond.donor,
                hydrogen: hbond.hydrogen,
                acceptor: hbond.acceptor,
                donor_atom: topology.atom_label(hbond.donor)?,
                hydrogen_atom: topology.atom_label(hbond.hydrogen)?,
                acceptor_atom: topology.atom_label(hbond.acceptor)?,
            };
            writer
                .serialize(row)
                .map_err(|e| format!("Failed to write CSV row: {}", e))?;
        }
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush CSV file: {}", e))?;

    Ok(())
}

/// Save the number of filtered hydrogen bonds in each frame to CSV file
pub fn save_counts_to_csv(filtered: &[Vec<HBond>], output_path: &Path) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(output_path)
        .map_err(|e| format!("Failed to create CSV file {}: {}", output_path.display(), e))?;

    for (frame, hbonds) in filtered.iter().enumerate() {
        writer
            .serialize(CountRow {
                frame,
                n_hbonds: hbonds.len(),
            })
            .map_err(|e| format!("Failed to write CSV row: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush CSV file: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::tests::two_chain_topology;
    use std::fs;
    use tempfile::tempdir;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<(), String>,
    {
        let mut buffer = Vec::new();
        f(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_write_chains() {
        let top = two_chain_topology();
        let output = render(|w| write_chains(w, &top));
        assert_eq!(output, "0 [SER1]\n1 [DG1, HOH2]\n");
    }

    #[test]
    fn test_write_hbonds_first_frame() {
        let top = two_chain_topology();
        let filtered = vec![vec![HBond::new(0, 1, 3)], vec![]];
        let output = render(|w| write_hbonds(w, &top, &filtered));

        assert_eq!(
            output,
            "List of hydrogen bonds in the first frame:\n\
             SER1-N SER1-H DG1-O6\n\
             There are 1 hydrogen bonds in the first frame between the protein and the other chains\n"
        );
    }

    #[test]
    fn test_write_hbonds_no_frames() {
        let top = two_chain_topology();
        let output = render(|w| write_hbonds(w, &top, &[]));
        assert_eq!(output, "The trajectory contains no frames\n");

        let invalid = vec![vec![HBond::new(0, 1, 99)]];
        let mut buffer = Vec::new();
        assert!(write_hbonds(&mut buffer, &top, &invalid).is_err());
    }

    #[test]
    fn test_summarize() {
        let filtered = vec![
            vec![HBond::new(0, 1, 3)],
            vec![],
            vec![HBond::new(0, 1, 3), HBond::new(3, 1, 2)],
        ];
        let summary = summarize(&filtered).unwrap();
        assert_eq!(summary.counts, vec![1, 0, 2]);
        assert_eq!(summary.mean, 1.0);
        assert_eq!(summary.min, 0);
        assert_eq!(summary.max, 2);

        let output = render(|w| write_summary(w, &summary));
        assert_eq!(
            output,
            "Hydrogen bonds per frame over 3 frames: mean 1.00, min 0, max 2\n"
        );

        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_save_csv() {
        let top = two_chain_topology();
        let filtered = vec![vec![HBond::new(0, 1, 3)], vec![], vec![HBond::new(3, 1, 2)]];
        let dir = tempdir().unwrap();

        let hbonds_path = dir.path().join("hbonds.csv");
        save_hbonds_to_csv(&top, &filtered, &hbonds_path).unwrap();
        let content = fs::read_to_string(&hbonds_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "frame,donor,hydrogen,acceptor,donor_atom,hydrogen_atom,acceptor_atom"
        );
        assert_eq!(lines[1], "0,0,1,3,SER1-N,SER1-H,DG1-O6");
        assert_eq!(lines[2], "2,3,1,2,DG1-O6,SER1-H,SER1-OG");
        assert_eq!(lines.len(), 3);

        let counts_path = dir.path().join("counts.csv");
        save_counts_to_csv(&filtered, &counts_path).unwrap();
        let content = fs::read_to_string(&counts_path).unwrap();
        assert_eq!(content, "frame,n_hbonds\n0,1\n1,0\n2,1\n");
    }
}
