use clap::{Parser, Subcommand};
use hbond_analysis_rs::{
    print_chains, print_hbonds, print_summary, process_hbonds, save_counts_to_csv,
    save_hbonds_to_csv, summarize, validate_protein_chain, PdbTrajectory, Trajectory,
    WernetNilsson,
};
use std::path::PathBuf;

/// Command-line tool for finding hydrogen bonds between a protein chain and the other chains
#[derive(Parser)]
#[command(name = "hbond-analysis")]
#[command(about = "Analyze protein-DNA hydrogen bonds in PDB trajectories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List chains of the system and their residues
    Chains {
        /// Path to the PDB trajectory file
        #[arg(short, long)]
        trajectory: PathBuf,

        /// Do not remove water and ions
        #[arg(long)]
        keep_solvent: bool,
    },

    /// Detect hydrogen bonds between the protein chain and the other chains
    Analyze {
        /// Path to the PDB trajectory file
        #[arg(short, long)]
        trajectory: PathBuf,

        /// Index of the protein chain, counted from 0 after solvent removal (default: 0)
        #[arg(short, long, default_value_t = 0)]
        protein_chain: usize,

        /// Maximum number of frames to process (default: all frames)
        #[arg(long)]
        max_frames: Option<usize>,

        /// Do not remove water and ions
        #[arg(long)]
        keep_solvent: bool,

        /// Ignore the simulation box when measuring distances
        #[arg(long)]
        no_periodic: bool,

        /// Output CSV path listing every filtered hydrogen bond
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output CSV path with the number of hydrogen bonds per frame
        #[arg(long)]
        counts: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Chains {
            trajectory,
            keep_solvent,
        } => list_chains(trajectory, keep_solvent),

        Commands::Analyze {
            trajectory,
            protein_chain,
            max_frames,
            keep_solvent,
            no_periodic,
            output,
            counts,
        } => analyze(
            trajectory,
            protein_chain,
            max_frames,
            keep_solvent,
            no_periodic,
            output,
            counts,
        ),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn list_chains(trajectory: PathBuf, keep_solvent: bool) -> Result<(), String> {
    println!("Reading trajectory: {:?}", trajectory);

    let traj = PdbTrajectory::new(&trajectory);
    let data = traj
        .load(Some(1), !keep_solvent)
        .map_err(|e| format!("Failed to read trajectory: {}", e))?;

    println!(
        "✅ Loaded {} atoms in {} chains",
        data.n_atoms(),
        data.topology.n_chains()
    );
    print_chains(&data.topology)
}

fn analyze(
    trajectory: PathBuf,
    protein_chain: usize,
    max_frames: Option<usize>,
    keep_solvent: bool,
    no_periodic: bool,
    output: Option<PathBuf>,
    counts: Option<PathBuf>,
) -> Result<(), String> {
    println!("Reading trajectory: {:?}", trajectory);
    println!("Protein chain: {}", protein_chain);

    let detector = WernetNilsson {
        periodic: !no_periodic,
        ..WernetNilsson::default()
    };

    let traj = PdbTrajectory::new(&trajectory);
    let data = traj
        .load(max_frames, !keep_solvent)
        .map_err(|e| format!("Failed to read trajectory: {}", e))?;
    println!(
        "✅ Loaded {} frames ({} atoms)",
        data.n_frames(),
        data.n_atoms()
    );

    let topology = &data.topology;
    validate_protein_chain(topology, protein_chain)?;

    let hbond_traj = detector
        .compute(&data)
        .map_err(|e| format!("Failed to analyze trajectory: {}", e))?;

    print_chains(topology)?;

    let filtered = process_hbonds(&hbond_traj, topology, protein_chain)?;
    print_hbonds(topology, &filtered)?;

    if let Some(summary) = summarize(&filtered) {
        print_summary(&summary)?;
    }

    if let Some(output_path) = output {
        save_hbonds_to_csv(topology, &filtered, &output_path)?;
        println!("📄 Hydrogen bonds saved to: {:?}", output_path);
    }

    if let Some(counts_path) = counts {
        save_counts_to_csv(&filtered, &counts_path)?;
        println!("📄 Counts saved to: {:?}", counts_path);
    }

    Ok(())
}
