//! The `index` subcommand: normalize a FASTA reference and persist the
//! five index artifacts next to it.

use std::path::Path;

use log::info;

use crate::error::Result;
use crate::genome::Genome;
use crate::index::{BuildParams, Index};

pub struct IndexCommand {
    /// Seed of the ambiguous-base replacement stream.
    pub seed: u64,
    pub params: BuildParams,
}

impl IndexCommand {
    pub fn new() -> Self {
        IndexCommand {
            seed: 0,
            params: BuildParams::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Tables with non-default shape, used by tests working on tiny
    /// references.
    pub fn with_params(mut self, params: BuildParams) -> Self {
        self.params = params;
        self
    }

    pub fn run(&self, fasta: &Path) -> Result<()> {
        info!("reading genome from {}", fasta.display());
        let genome = Genome::from_fasta(fasta, self.seed)?;
        info!(
            "{} chromosomes, {} bp forward",
            genome.chroms.chroms.len(),
            genome.chroms.forward_len
        );

        let index = Index::build(&genome, &self.params)?;
        index.save(fasta)?;
        info!("index written to {}.{{sa,bwt,occ,lut,chr}}", fasta.display());
        Ok(())
    }
}

impl Default for IndexCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{artifact_path, Kind};
    use std::io::Write;
    use tempfile::tempdir;

    fn small() -> BuildParams {
        BuildParams {
            lut_k: 5,
            csa_period: 8,
        }
    }

    #[test]
    fn test_index_writes_all_artifacts() {
        let dir = tempdir().unwrap();
        let fasta = dir.path().join("ref.fa");
        let mut file = std::fs::File::create(&fasta).unwrap();
        writeln!(file, ">chr1").unwrap();
        writeln!(file, "ACGTACGGATTTACACAGTACCAGATCGAGAGATCTTCTAAGCTTGCAGT").unwrap();

        IndexCommand::new().with_params(small()).run(&fasta).unwrap();

        for kind in [Kind::Bwt, Kind::Occ, Kind::Csa, Kind::Lut, Kind::Chr] {
            assert!(artifact_path(&fasta, kind).exists(), "{kind:?}");
        }
        assert!(Index::load(&fasta).is_ok());
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let dir = tempdir().unwrap();
        let fasta = dir.path().join("ref.fa");
        let mut file = std::fs::File::create(&fasta).unwrap();
        writeln!(file, ">chr1").unwrap();
        // Ambiguous bases exercise the seeded stream.
        writeln!(file, "ACGTNNNNACGGATTTACACAGTACCAGATCGANNGAGATCTTCTAAGCT").unwrap();

        let cmd = IndexCommand::new().with_seed(5).with_params(small());
        cmd.run(&fasta).unwrap();
        let first: Vec<Vec<u8>> = [Kind::Bwt, Kind::Occ, Kind::Csa, Kind::Lut, Kind::Chr]
            .iter()
            .map(|&k| std::fs::read(artifact_path(&fasta, k)).unwrap())
            .collect();

        cmd.run(&fasta).unwrap();
        for (i, &kind) in [Kind::Bwt, Kind::Occ, Kind::Csa, Kind::Lut, Kind::Chr]
            .iter()
            .enumerate()
        {
            let again = std::fs::read(artifact_path(&fasta, kind)).unwrap();
            assert_eq!(again, first[i], "{kind:?} not reproducible");
        }
    }
}
