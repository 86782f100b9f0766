/// Default upper bound on a chunk's length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Splits raw text into the units the chunker packs together.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Heuristic sentence splitter.
///
/// Sentences end at a literal `". "`, so abbreviations and decimals
/// followed by a space will split a sentence in two.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceSegmenter;

impl Segmenter for SentenceSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        text.replace('\n', " ")
            .split(". ")
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
            .map(|sentence| {
                if sentence.ends_with('.') {
                    sentence.to_string()
                } else {
                    format!("{}.", sentence)
                }
            })
            .collect()
    }
}

/// Greedy length-bounded packer over the segments of a text.
pub struct Chunker {
    segmenter: Box<dyn Segmenter>,
    chunk_size: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Chunker {
    pub fn new(chunk_size: usize) -> Self {
        Self::with_segmenter(Box::new(SentenceSegmenter), chunk_size)
    }

    pub fn with_segmenter(segmenter: Box<dyn Segmenter>, chunk_size: usize) -> Self {
        Self {
            segmenter,
            chunk_size,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Packs segments into chunks. The running size counts segment
    /// characters only, not the spaces joining them. A segment is never
    /// split, so one longer than `chunk_size` becomes its own oversized chunk.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_size = 0;

        for segment in self.segmenter.segment(text) {
            let segment_size = segment.chars().count();

            if current_size + segment_size > self.chunk_size && !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
                current_size = 0;
            }

            current_size += segment_size;
            current.push(segment);
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }
}
