//! Repository reading and chunking
//!
//! Walks a checked-out repository, renders its file tree, reads the readme
//! and supported source files, and splits text into overlapping chunks for
//! embedding.

mod chunker;
mod file_walker;

pub use chunker::{TextChunker, reassemble};
pub use file_walker::{FileWalker, SourceFile, build_file_tree, read_readme};

use serde::{Deserialize, Serialize};

/// A contiguous piece of one source, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk text
    pub text: String,
    /// Identifier of the source the text came from (relative path, or a
    /// synthetic id such as `readme` or `pages/{title}`)
    pub source_id: String,
    /// Position of this chunk among the chunks of its source
    pub sequence_index: usize,
    /// Byte offset of `text` within its source
    pub offset: usize,
}
