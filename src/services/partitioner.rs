//! 任务切分服务
//!
//! 把一本书的章节切成若干段，再与译本做笛卡尔积得到任务列表；
//! 句子列表用同样的均匀切分得到句子批次。

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::catalog::{Book, VersionId};
use crate::models::sentence::{Languages, SentencePair, SentenceTask};
use crate::models::task::{ChapterRange, Task};

/// 把 `1..=total` 均匀切成若干段，每段不超过 `max_span`
///
/// 段数为 `ceil(total / max_span)`，余数分给前几段，所以不会出现很短的尾段。
/// `max_span` 为 0 时按 1 处理；`total` 为 0 时返回空列表。
pub fn split_evenly(total: u32, max_span: u32) -> Vec<ChapterRange> {
    let max_span = max_span.max(1);
    if total == 0 {
        return Vec::new();
    }
    if total <= max_span {
        return vec![ChapterRange::new(1, total)];
    }

    let num_ranges = total.div_ceil(max_span);
    let base = total / num_ranges;
    let remainder = total % num_ranges;

    let mut ranges = Vec::with_capacity(num_ranges as usize);
    let mut start = 1;
    for i in 0..num_ranges {
        let len = base + u32::from(i < remainder);
        let end = start + len - 1;
        ranges.push(ChapterRange::new(start, end));
        start = end + 1;
    }
    ranges
}

/// 生成全部任务：译本 × 书卷 × 章节段，打乱后从 1 开始编号
///
/// 不含次经的译本跳过次经书卷。打乱顺序是为了避免每次运行都按相同顺序访问同一个来源。
pub fn build_tasks<R: Rng + ?Sized>(
    books: &[&'static Book],
    versions: &[VersionId],
    max_span: u32,
    rng: &mut R,
) -> Vec<Task> {
    let mut pending: Vec<(&'static Book, VersionId, ChapterRange)> = Vec::new();
    for &version in versions {
        for &book in books {
            if book.is_deuterocanonical() && !version.info().apocrypha {
                continue;
            }
            for range in split_evenly(book.chapters, max_span) {
                pending.push((book, version, range));
            }
        }
    }

    pending.shuffle(rng);

    pending
        .into_iter()
        .enumerate()
        .map(|(idx, (book, version, range))| Task {
            id: idx + 1,
            book,
            version,
            range,
        })
        .collect()
}

/// 把句子列表切成批次任务，打乱后从 1 开始编号
///
/// 只打乱任务顺序，不打乱句子本身：序号范围要在下一次运行时指向同样的句子。
pub fn build_sentence_tasks<R: Rng + ?Sized>(
    pairs: &[SentencePair],
    languages: &Languages,
    max_span: u32,
    rng: &mut R,
) -> Vec<SentenceTask> {
    let total = u32::try_from(pairs.len()).unwrap_or(u32::MAX);
    let mut ranges = split_evenly(total, max_span);
    ranges.shuffle(rng);

    ranges
        .into_iter()
        .enumerate()
        .map(|(idx, range)| SentenceTask {
            id: idx + 1,
            languages: languages.clone(),
            range,
            pairs: pairs[(range.start - 1) as usize..range.end as usize].to_vec(),
        })
        .collect()
}
