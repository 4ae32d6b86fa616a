//! 圣经书卷与译本目录
//!
//! 书卷顺序就是语料的规范顺序：合并时按这里的位置排序，而不是按名称字母序
//! （"1 Samuel" 这类带数字的书名按字母序排会乱掉）。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 书卷信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Book {
    pub id: u32,
    pub name: &'static str,
    pub abbr: &'static str,
    pub chapters: u32,
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.abbr)
    }
}

impl Book {
    /// 次经书卷（Tobit 到 Baruch）
    pub fn is_deuterocanonical(&self) -> bool {
        (40..=46).contains(&self.id)
    }
}

macro_rules! book {
    ($id:expr, $name:expr, $abbr:expr, $chapters:expr) => {
        Book {
            id: $id,
            name: $name,
            abbr: $abbr,
            chapters: $chapters,
        }
    };
}

/// 规范顺序的书卷列表（旧约 → 次经 → 新约）
pub static BOOKS: &[Book] = &[
    book!(1, "Genesis", "GEN", 50),
    book!(2, "Exodus", "EXO", 40),
    book!(3, "Leviticus", "LEV", 27),
    book!(4, "Numbers", "NUM", 36),
    book!(5, "Deuteronomy", "DEU", 34),
    book!(6, "Joshua", "JOS", 24),
    book!(7, "Judges", "JDG", 21),
    book!(8, "Ruth", "RUT", 4),
    book!(9, "1 Samuel", "1SA", 31),
    book!(10, "2 Samuel", "2SA", 24),
    book!(11, "1 Kings", "1KI", 22),
    book!(12, "2 Kings", "2KI", 25),
    book!(13, "1 Chronicles", "1CH", 29),
    book!(14, "2 Chronicles", "2CH", 36),
    book!(15, "Ezra", "EZR", 10),
    book!(16, "Nehemiah", "NEH", 13),
    book!(17, "Esther", "EST", 10),
    book!(18, "Job", "JOB", 42),
    book!(19, "Psalms", "PSA", 150),
    book!(20, "Proverbs", "PRO", 31),
    book!(21, "Ecclesiastes", "ECC", 12),
    book!(22, "Song of Solomon", "SNG", 8),
    book!(23, "Isaiah", "ISA", 66),
    book!(24, "Jeremiah", "JER", 52),
    book!(25, "Lamentations", "LAM", 5),
    book!(26, "Ezekiel", "EZK", 48),
    book!(27, "Daniel", "DAN", 12),
    book!(28, "Hosea", "HOS", 14),
    book!(29, "Joel", "JOL", 3),
    book!(30, "Amos", "AMO", 9),
    book!(31, "Obadiah", "OBA", 1),
    book!(32, "Jonah", "JON", 4),
    book!(33, "Micah", "MIC", 7),
    book!(34, "Nahum", "NAM", 3),
    book!(35, "Habakkuk", "HAB", 3),
    book!(36, "Zephaniah", "ZEP", 3),
    book!(37, "Haggai", "HAG", 2),
    book!(38, "Zechariah", "ZEC", 14),
    book!(39, "Malachi", "MAL", 4),
    // 次经
    book!(40, "Tobit", "TOB", 14),
    book!(41, "Judith", "JDT", 16),
    book!(42, "1 Maccabees", "1MA", 16),
    book!(43, "2 Maccabees", "2MA", 15),
    book!(44, "Wisdom", "WIS", 19),
    book!(45, "Sirach", "SIR", 51),
    book!(46, "Baruch", "BAR", 6),
    // 新约
    book!(47, "Matthew", "MAT", 28),
    book!(48, "Mark", "MRK", 16),
    book!(49, "Luke", "LUK", 24),
    book!(50, "John", "JHN", 21),
    book!(51, "Acts", "ACT", 28),
    book!(52, "Romans", "ROM", 16),
    book!(53, "1 Corinthians", "1CO", 16),
    book!(54, "2 Corinthians", "2CO", 13),
    book!(55, "Galatians", "GAL", 6),
    book!(56, "Ephesians", "EPH", 6),
    book!(57, "Philippians", "PHP", 4),
    book!(58, "Colossians", "COL", 4),
    book!(59, "1 Thessalonians", "1TH", 5),
    book!(60, "2 Thessalonians", "2TH", 3),
    book!(61, "1 Timothy", "1TI", 6),
    book!(62, "2 Timothy", "2TI", 4),
    book!(63, "Titus", "TIT", 3),
    book!(64, "Philemon", "PHM", 1),
    book!(65, "Hebrews", "HEB", 13),
    book!(66, "James", "JAS", 5),
    book!(67, "1 Peter", "1PE", 5),
    book!(68, "2 Peter", "2PE", 3),
    book!(69, "1 John", "1JN", 5),
    book!(70, "2 John", "2JN", 1),
    book!(71, "3 John", "3JN", 1),
    book!(72, "Jude", "JUD", 1),
    book!(73, "Revelation", "REV", 22),
];

/// 默认抓取的书卷
pub const DEFAULT_BOOKS: &[&str] = &["Romans", "Mark", "Luke", "Matthew", "John"];

/// 按 id 查找书卷
pub fn book_by_id(id: u32) -> Option<&'static Book> {
    BOOKS.iter().find(|b| b.id == id)
}

/// 按名称或缩写查找书卷（不区分大小写）
pub fn find_book(name_or_abbr: &str) -> Option<&'static Book> {
    let needle = name_or_abbr.trim();
    BOOKS
        .iter()
        .find(|b| b.name.eq_ignore_ascii_case(needle) || b.abbr.eq_ignore_ascii_case(needle))
}

/// 书卷在规范列表中的位置；未知书卷排在最后
pub fn canonical_position(book_id: u32) -> usize {
    BOOKS
        .iter()
        .position(|b| b.id == book_id)
        .unwrap_or(usize::MAX)
}

/// 译本标识（封闭集合）
///
/// 序列化为合并语料中的字段名，例如 `koad21_text`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VersionId {
    #[serde(rename = "koad21_text")]
    Koad21,
    #[serde(rename = "bcnda_text")]
    Bcnda,
    #[serde(rename = "abk_text")]
    Abk,
    #[serde(rename = "cpdv_text")]
    Cpdv,
    #[serde(rename = "bcc1923_text")]
    Bcc1923,
    #[serde(rename = "niv_text")]
    Niv,
    #[serde(rename = "pdv2017_text")]
    Pdv2017,
}

/// 译本的静态信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    /// bible.com 上的译本编号
    pub site_id: u32,
    /// URL 与文件名里用的大写后缀
    pub suffix: &'static str,
    pub language: &'static str,
    pub name: &'static str,
    /// 单译本文本输出文件名
    pub file: &'static str,
    /// 是否包含次经
    pub apocrypha: bool,
}

impl VersionId {
    /// 默认参与抓取的译本（顺序即输出列顺序）
    pub const ALL: [VersionId; 7] = [
        VersionId::Koad21,
        VersionId::Bcnda,
        VersionId::Abk,
        VersionId::Cpdv,
        VersionId::Bcc1923,
        VersionId::Niv,
        VersionId::Pdv2017,
    ];

    pub fn info(self) -> VersionInfo {
        match self {
            VersionId::Koad21 => VersionInfo {
                site_id: 1231,
                suffix: "KOAD21",
                language: "Breton",
                name: "Bibl Koad 21",
                file: "bible_koad21.txt",
                apocrypha: true,
            },
            VersionId::Bcnda => VersionInfo {
                site_id: 4523,
                suffix: "BCNDA",
                language: "Welsh",
                name: "Beibl Cymraeg Newydd Diwygiedig yn cynnwys yr Apocryffa 2008",
                file: "bible_bcnda.txt",
                apocrypha: false,
            },
            VersionId::Abk => VersionInfo {
                site_id: 1079,
                suffix: "ABK",
                language: "Cornish",
                name: "An Bibel Kernewek 20234 (Kernewek Kemmyn)",
                file: "bible_abk.txt",
                apocrypha: true,
            },
            VersionId::Cpdv => VersionInfo {
                site_id: 42,
                suffix: "CPDV",
                language: "English",
                name: "Catholic Public Domain Version",
                file: "bible_cpdv.txt",
                apocrypha: true,
            },
            // 马可福音 4:40-41 在该译本里合并成了一节
            VersionId::Bcc1923 => VersionInfo {
                site_id: 504,
                suffix: "BCC1923",
                language: "French",
                name: "Bible Catholique Crampon 1923",
                file: "bible_bcc1923.txt",
                apocrypha: true,
            },
            VersionId::Niv => VersionInfo {
                site_id: 111,
                suffix: "NIV",
                language: "English",
                name: "New International Version",
                file: "bible_niv.txt",
                apocrypha: false,
            },
            VersionId::Pdv2017 => VersionInfo {
                site_id: 133,
                suffix: "PDV2017",
                language: "French",
                name: "Parole de Vie 2017",
                file: "bible_pdv2017.txt",
                apocrypha: true,
            },
        }
    }

    pub fn suffix(self) -> &'static str {
        self.info().suffix
    }

    /// 合并语料中的字段名
    pub fn text_key(self) -> String {
        format!("{}_text", self.suffix().to_lowercase())
    }

    /// 按后缀查找译本（不区分大小写）
    pub fn from_suffix(s: &str) -> Option<Self> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.suffix().eq_ignore_ascii_case(needle))
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}
