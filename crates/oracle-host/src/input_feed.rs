//! Pull-based input feed for guests that stream inputs through `wasm_input`
//!
//! Each item is delivered as its byte length followed by 8-byte big-endian
//! chunks; the final chunk holds the remaining bytes right-aligned.

use oracle_core::constants::WORD_SIZE;
use oracle_core::{HostConfig, InputSource, PreimageBlob};

use crate::error::{HostError, Result, Termination};

/// Position in the item list; only ever moves forward
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputCursor {
    pub item: usize,
    pub offset: usize,
    length_sent: bool,
}

/// Ordered list of input items with a cursor over it
#[derive(Debug, Default)]
pub struct ItemFeed {
    items: Vec<Vec<u8>>,
    cursor: InputCursor,
}

impl ItemFeed {
    pub fn new(items: Vec<Vec<u8>>) -> Self {
        Self {
            items,
            cursor: InputCursor::default(),
        }
    }

    pub fn cursor(&self) -> InputCursor {
        self.cursor
    }

    fn advance_item(&mut self) {
        self.cursor = InputCursor {
            item: self.cursor.item + 1,
            ..InputCursor::default()
        };
    }

    pub fn next_word(&mut self) -> Result<u64> {
        let Some(item) = self.items.get(self.cursor.item) else {
            return Err(HostError::InputExhausted(self.items.len()));
        };
        let len = item.len();

        if !self.cursor.length_sent {
            self.cursor.length_sent = true;
            if len == 0 {
                self.advance_item();
            }
            return Ok(len as u64);
        }

        let end = (self.cursor.offset + WORD_SIZE).min(len);
        let word = item[self.cursor.offset..end]
            .iter()
            .fold(0u64, |w, &b| (w << 8) | b as u64);
        self.cursor.offset = end;
        if end == len {
            self.advance_item();
        }
        Ok(word)
    }
}

/// Backing data for `wasm_input`
pub enum InputFeed {
    /// Configured items, length word then chunks
    Items(ItemFeed),
    /// Raw big-endian words from the preimage blob
    Blob(PreimageBlob),
}

impl InputFeed {
    pub fn from_config(config: &HostConfig) -> Result<Self> {
        match config.input_source {
            InputSource::Items => {
                let items = config.decoded_inputs()?;
                tracing::debug!(items = items.len(), "Input feed loaded");
                Ok(InputFeed::Items(ItemFeed::new(items)))
            }
            InputSource::Blob => Ok(InputFeed::Blob(PreimageBlob::open(&config.preimages_bin)?)),
        }
    }

    pub fn items(items: Vec<Vec<u8>>) -> Self {
        InputFeed::Items(ItemFeed::new(items))
    }

    /// Next 8-byte word for the guest
    ///
    /// `is_public` marks public inputs for the prover; both kinds are served
    /// from the same sequence here.
    pub fn next_input(&mut self, is_public: bool) -> Result<u64> {
        let word = match self {
            InputFeed::Items(feed) => feed.next_word()?,
            InputFeed::Blob(blob) => blob.read_word()? as u64,
        };
        tracing::trace!(is_public, word, "wasm_input");
        Ok(word)
    }
}

impl Default for InputFeed {
    fn default() -> Self {
        InputFeed::Items(ItemFeed::default())
    }
}

/// Guest assertion; zero ends the run
pub fn require(condition: u32) -> std::result::Result<(), Termination> {
    if condition == 0 {
        tracing::error!("{}", Termination::AssertionFailed);
        return Err(Termination::AssertionFailed);
    }
    Ok(())
}

/// Guest-requested exit with `code`
pub fn exit(code: i32) -> Termination {
    tracing::debug!(code, "wasm_exit");
    Termination::Exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_core::Mode;

    #[test]
    fn test_hello_item() {
        let config = HostConfig::new(Mode::InputFeed).with_inputs(vec!["68656c6c6f".into()]);
        let mut feed = InputFeed::from_config(&config).unwrap();

        assert_eq!(feed.next_input(false).unwrap(), 5);
        assert_eq!(feed.next_input(false).unwrap(), 0x68656c6c6f);
        assert!(matches!(feed.next_input(false), Err(HostError::InputExhausted(1))));
    }

    #[test]
    fn test_multi_chunk_items() {
        let mut feed = ItemFeed::new(vec![
            (1..=10).collect(),
            Vec::new(),
            vec![0xff; 8],
        ]);

        assert_eq!(feed.next_word().unwrap(), 10);
        assert_eq!(feed.next_word().unwrap(), 0x0102030405060708);
        assert_eq!(feed.cursor().offset, 8);
        assert_eq!(feed.next_word().unwrap(), 0x090a);
        assert_eq!(feed.cursor().item, 1);

        // empty item is just its length
        assert_eq!(feed.next_word().unwrap(), 0);
        assert_eq!(feed.cursor().item, 2);

        assert_eq!(feed.next_word().unwrap(), 8);
        assert_eq!(feed.next_word().unwrap(), u64::MAX);
        assert_eq!(feed.cursor().item, 3);
        assert!(feed.next_word().is_err());
    }

    #[test]
    fn test_blob_words() {
        let mut bytes = 5u64.to_be_bytes().to_vec();
        bytes.extend_from_slice(&(-1i64).to_be_bytes());
        let mut feed = InputFeed::Blob(PreimageBlob::from_bytes(bytes));

        assert_eq!(feed.next_input(true).unwrap(), 5);
        assert_eq!(feed.next_input(true).unwrap(), u64::MAX);
        assert!(matches!(
            feed.next_input(true),
            Err(HostError::Preimage(oracle_core::Error::EndOfData { .. }))
        ));
    }

    #[test]
    fn test_require_and_exit() {
        assert!(require(1).is_ok());
        assert!(require(u32::MAX).is_ok());
        assert_eq!(require(0), Err(Termination::AssertionFailed));
        assert_eq!(exit(3), Termination::Exit(3));
    }
}
