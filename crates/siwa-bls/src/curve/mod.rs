/// BLS12-381 through the `paired` crate
pub mod bls12381;
