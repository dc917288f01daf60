//! Wiki generation: structure synthesis, markup repair, page writing and
//! segment splitting

pub mod markup;
pub mod pages;
pub mod segments;
pub mod structure;
pub mod synthesizer;

pub use markup::{RepairedStructure, repair_structure};
pub use pages::{PageFailure, PageGenerationReport, PageGenerator, PageSettings};
pub use segments::{Segment, render_segments, split_segments};
pub use structure::{Page, Section, StructureDocument};
pub use synthesizer::{StructureSynthesizer, SynthesisConfig, SynthesisOutput, Termination};
