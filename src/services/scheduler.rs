//! 节奏调度服务 - 业务能力层
//!
//! 控制两个时间尺度上的请求节奏：
//! - `ensure_batch_interval`：全进程任意两次请求开始之间的最小间隔
//! - `ensure_interval_before_next_batch`：worker 完成一个任务后、开始下一个任务前的停顿，
//!   停顿时长乘以随整体进度上升的疲劳系数
//!
//! 共享状态只有一把锁，且从不在持锁期间 sleep。

use rand::Rng;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::Config;

/// 调度参数（秒）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    pub batch_interval: (f64, f64),
    pub new_batch_delay_range: (f64, f64),
    pub sleeping_threshold_ratio: f64,
}

impl From<&Config> for PacingConfig {
    fn from(config: &Config) -> Self {
        Self {
            batch_interval: (config.min_batch_interval, config.max_batch_interval),
            new_batch_delay_range: config.new_batch_delay_range,
            sleeping_threshold_ratio: config.sleeping_threshold_ratio,
        }
    }
}

#[derive(Debug)]
struct PacingState {
    /// 最近一次（或已预约的）请求开始时间
    last_batch_start: Option<Instant>,
    completed_batches: usize,
    /// 正在等待请求间隔或任务间停顿的 worker 数，两种等待都计入
    sleeping_workers: usize,
    max_workers: usize,
}

/// 任务间停顿的决策结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacingDecision {
    /// 已有超过一半的 worker 在休眠
    SkippedLoadShedding,
    /// 已完成数达到总数
    SkippedNoWork,
    /// 剩余任务少于 worker 数，队列正在收尾
    SkippedTail { remaining: usize },
    /// 实际休眠
    Slept { delay: Duration, fatigue: f64 },
}

/// 节奏调度器
///
/// 每次运行创建一个，通过 `Arc` 注入所有 worker。
#[derive(Debug)]
pub struct PacingScheduler {
    config: PacingConfig,
    state: Mutex<PacingState>,
}

/// 休眠计数守卫：无论正常结束、panic 还是 future 被取消都会减一
struct SleepingGuard<'a> {
    scheduler: &'a PacingScheduler,
}

impl Drop for SleepingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.scheduler.lock();
        state.sleeping_workers = state.sleeping_workers.saturating_sub(1);
    }
}

impl PacingScheduler {
    pub fn new(config: PacingConfig, max_workers: usize) -> Self {
        Self {
            config,
            state: Mutex::new(PacingState {
                last_batch_start: None,
                completed_batches: 0,
                sleeping_workers: 0,
                max_workers: max_workers.max(1),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PacingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_max_workers(&self, max_workers: usize) {
        self.lock().max_workers = max_workers.max(1);
    }

    pub fn max_workers(&self) -> usize {
        self.lock().max_workers
    }

    pub fn sleeping_workers(&self) -> usize {
        self.lock().sleeping_workers
    }

    pub fn completed_batches(&self) -> usize {
        self.lock().completed_batches
    }

    /// 休眠 worker 数达到该阈值时请求间隔减半
    fn sleeping_threshold(&self, max_workers: usize) -> usize {
        ((max_workers as f64 * self.config.sleeping_threshold_ratio).ceil() as usize).max(1)
    }

    /// 保证任意两次请求开始之间至少间隔一个随机区间
    ///
    /// 检查与更新在同一次加锁内完成：调用方先预约自己的开始时间，再在锁外等待，
    /// 所以并发调用之间不会出现先查后写的竞争。
    ///
    /// # 返回
    /// 返回实际等待的时长
    pub async fn ensure_batch_interval(&self, label: &str) -> Duration {
        let (wait, halved) = {
            let mut state = self.lock();
            let now = Instant::now();

            let mut interval = random_secs(self.config.batch_interval);
            let halved = state.sleeping_workers >= self.sleeping_threshold(state.max_workers);
            if halved {
                interval /= 2;
            }

            let slot = match state.last_batch_start {
                Some(last) => (last + interval).max(now),
                None => now,
            };
            state.last_batch_start = Some(slot);

            let wait = slot.saturating_duration_since(now);
            if !wait.is_zero() {
                state.sleeping_workers += 1;
            }
            (wait, halved)
        };

        if wait.is_zero() {
            return wait;
        }

        let _guard = SleepingGuard { scheduler: self };
        if halved {
            debug!("{} 休眠 worker 过多，请求间隔减半", label);
        }
        info!("{} 等待 {:.2}s 以保持请求间隔", label, wait.as_secs_f64());
        sleep(wait).await;
        wait
    }

    /// 不经过停顿地记一个已完成任务（例如直接复用检查点的任务）
    ///
    /// 计数不会超过 `total_batches`；返回记录后的完成数。
    pub fn record_completed(&self, total_batches: usize) -> usize {
        let mut state = self.lock();
        if state.completed_batches < total_batches {
            state.completed_batches += 1;
        }
        state.completed_batches
    }

    /// worker 开始下一个任务前的停顿
    ///
    /// 疲劳系数 `0.5 + 2.0 * completed / total`，从 0.5 线性升到 2.5。
    ///
    /// 负载判断用的休眠数同时包含停在 `ensure_batch_interval` 里的 worker。
    pub async fn ensure_interval_before_next_batch(
        &self,
        total_batches: usize,
        label: &str,
    ) -> PacingDecision {
        debug!("{} 检查下一个任务前的停顿...", label);

        let (delay, fatigue) = {
            let mut state = self.lock();

            if state.sleeping_workers * 2 > state.max_workers {
                debug!(
                    "{} 已有 {} 个 worker 在休眠，跳过停顿",
                    label, state.sleeping_workers
                );
                return PacingDecision::SkippedLoadShedding;
            }
            if state.completed_batches >= total_batches {
                return PacingDecision::SkippedNoWork;
            }

            state.completed_batches += 1;
            let completed = state.completed_batches;
            let remaining = total_batches - completed;
            if state.max_workers > remaining {
                debug!("{} 剩余 {} 个任务，不再停顿", label, remaining);
                return PacingDecision::SkippedTail { remaining };
            }

            let fatigue = fatigue_factor(completed, total_batches);
            let delay = random_secs(self.config.new_batch_delay_range).mul_f64(fatigue);
            state.sleeping_workers += 1;
            (delay, fatigue)
        };

        let _guard = SleepingGuard { scheduler: self };
        info!(
            "{} 休眠 {:.1}s 后开始下一个任务 (疲劳系数 {:.2})",
            label,
            delay.as_secs_f64(),
            fatigue
        );
        sleep(delay).await;
        info!("{} 下一个任务可以开始", label);

        PacingDecision::Slept { delay, fatigue }
    }
}

/// 疲劳系数
pub fn fatigue_factor(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.5;
    }
    0.5 + 2.0 * (completed as f64 / total as f64)
}

/// 在 `[min, max]` 秒内随机取一个时长
pub fn random_secs((min, max): (f64, f64)) -> Duration {
    let secs = if max > min {
        rand::thread_rng().gen_range(min..=max)
    } else {
        min
    };
    Duration::from_secs_f64(secs.max(0.0))
}
