pub mod bible_com;
pub mod extractor;
pub mod js_executor;
pub mod korpus;
pub mod translator;

pub use bible_com::{BibleComExtractor, BibleComSession};
pub use extractor::{Extractor, FetchOutcome};
pub use js_executor::JsExecutor;
pub use korpus::{KorpusSession, KorpusTranslator};
pub use translator::{Translation, Translator};
