use super::Chunk;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::ops::Range;

/// Separators tried largest-first before falling back to single characters
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Splits source text into overlapping chunks of bounded size
///
/// Sizes are measured in characters. A source is first cut into pieces no
/// larger than the target size, using the coarsest separator that works
/// (blank line, newline, space, then individual characters). Separators stay
/// attached to the end of the piece they terminate, so the pieces tile the
/// source exactly. Pieces are then greedily merged into chunks; each chunk
/// after the first starts with trailing pieces of its predecessor totalling at
/// most `overlap` characters.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker; `chunk_size` is clamped to at least one character
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap,
        }
    }

    /// Create a chunker with 512-character chunks and a 50-character overlap
    pub fn default_strategy() -> Self {
        Self::new(512, 50)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk a single source
    pub fn chunk_source(&self, source_id: &str, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.split_range(text, 0..text.len(), 0, &mut pieces);

        self.merge_pieces(text, &pieces)
            .into_iter()
            .enumerate()
            .map(|(sequence_index, range)| Chunk {
                text: text[range.clone()].to_string(),
                source_id: source_id.to_string(),
                sequence_index,
                offset: range.start,
            })
            .collect()
    }

    /// Chunk many sources in parallel; output keeps input order
    pub fn chunk_sources(&self, sources: &[(&str, &str)]) -> Vec<Chunk> {
        sources
            .par_iter()
            .map(|(id, text)| self.chunk_source(id, text))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    /// Cut `range` into pieces of at most `chunk_size` characters
    fn split_range(
        &self,
        text: &str,
        range: Range<usize>,
        level: usize,
        out: &mut Vec<(Range<usize>, usize)>,
    ) {
        let slice = &text[range.clone()];
        let len = slice.chars().count();
        if len <= self.chunk_size {
            out.push((range, len));
            return;
        }

        let Some(separator) = SEPARATORS.get(level) else {
            // Character level
            for (i, c) in slice.char_indices() {
                let start = range.start + i;
                out.push((start..start + c.len_utf8(), 1));
            }
            return;
        };

        if !slice.contains(separator) {
            self.split_range(text, range, level + 1, out);
            return;
        }

        let mut pos = range.start;
        while pos < range.end {
            let piece_end = match text[pos..range.end].find(separator) {
                Some(idx) => pos + idx + separator.len(),
                None => range.end,
            };
            self.split_range(text, pos..piece_end, level + 1, out);
            pos = piece_end;
        }
    }

    /// Greedily merge pieces into chunk ranges
    fn merge_pieces(&self, text: &str, pieces: &[(Range<usize>, usize)]) -> Vec<Range<usize>> {
        debug_assert!(pieces.iter().all(|(r, _)| !text[r.clone()].is_empty()));

        let mut chunks = Vec::new();
        let mut window: VecDeque<&(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = piece.1;
            if total + len > self.chunk_size && !window.is_empty() {
                chunks.push(window_range(&window));
                while total > self.overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some(dropped) => total -= dropped.1,
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        if !window.is_empty() {
            chunks.push(window_range(&window));
        }

        chunks
    }
}

fn window_range(window: &VecDeque<&(Range<usize>, usize)>) -> Range<usize> {
    let start = window.front().map(|p| p.0.start).unwrap_or(0);
    let end = window.back().map(|p| p.0.end).unwrap_or(start);
    start..end
}

/// Concatenate the chunks of one source, dropping the overlapping prefix of
/// each chunk. Chunks must be given in sequence order.
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let mut covered = 0usize;

    for chunk in chunks {
        let end = chunk.offset + chunk.text.len();
        if end <= covered {
            continue;
        }
        let skip = covered.saturating_sub(chunk.offset);
        out.push_str(&chunk.text[skip..]);
        covered = end;
    }

    out
}
