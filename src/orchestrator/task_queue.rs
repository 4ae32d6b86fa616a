//! 任务队列 - 编排层
//!
//! 多生产者多消费者队列，语义对应"带超时的 get + task_done + join"：
//! - `None` 是毒丸，worker 取到后退出
//! - `join` 等到每个已放入的元素都被 `task_done` 标记

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// 取任务超时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTimeout;

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<Option<T>>,
    unfinished: usize,
}

/// 任务队列
#[derive(Debug)]
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    item_available: Notify,
    all_done: Notify,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                unfinished: 0,
            }),
            item_available: Notify::new(),
            all_done: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 放入一个任务
    pub fn put(&self, item: T) {
        self.push(Some(item));
    }

    /// 放入一颗毒丸
    pub fn put_poison_pill(&self) {
        self.push(None);
    }

    fn push(&self, item: Option<T>) {
        {
            let mut state = self.lock();
            state.items.push_back(item);
            state.unfinished += 1;
        }
        self.item_available.notify_one();
    }

    /// 取出一个元素，最多等待 `timeout`
    ///
    /// `Ok(None)` 表示取到毒丸
    pub async fn get(&self, timeout: Duration) -> Result<Option<T>, QueueTimeout> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.item_available.notified();
            if let Some(item) = self.lock().items.pop_front() {
                return Ok(item);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                // 超时前最后再看一次
                return self.lock().items.pop_front().ok_or(QueueTimeout);
            }
        }
    }

    /// 标记一个取出的元素已处理完
    pub fn task_done(&self) {
        let finished = {
            let mut state = self.lock();
            state.unfinished = state.unfinished.saturating_sub(1);
            state.unfinished == 0
        };
        if finished {
            self.all_done.notify_waiters();
        }
    }

    /// 等待所有放入的元素都被标记完成
    pub async fn join(&self) {
        loop {
            let notified = self.all_done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.lock().unfinished == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 尚未 `task_done` 的元素数
    pub fn unfinished(&self) -> usize {
        self.lock().unfinished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fifo_and_poison_pill() {
        let queue = TaskQueue::new();
        queue.put(1);
        queue.put(2);
        queue.put_poison_pill();

        let timeout = Duration::from_millis(10);
        assert_eq!(queue.get(timeout).await, Ok(Some(1)));
        assert_eq!(queue.get(timeout).await, Ok(Some(2)));
        assert_eq!(queue.get(timeout).await, Ok(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_times_out_on_empty_queue() {
        let queue: TaskQueue<u32> = TaskQueue::new();
        let start = Instant::now();
        assert_eq!(queue.get(Duration::from_secs(10)).await, Err(QueueTimeout));
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_get_wakes_on_put() {
        let queue = Arc::new(TaskQueue::new());
        let q = queue.clone();
        let consumer = tokio::spawn(async move { q.get(Duration::from_secs(5)).await });

        tokio::task::yield_now().await;
        queue.put("task");
        assert_eq!(consumer.await.unwrap(), Ok(Some("task")));
    }

    #[tokio::test]
    async fn test_join_waits_for_task_done() {
        let queue = Arc::new(TaskQueue::new());
        queue.put(1);
        queue.put(2);

        let q = queue.clone();
        let worker = tokio::spawn(async move {
            while let Ok(Some(_)) = q.get(Duration::from_millis(50)).await {
                tokio::task::yield_now().await;
                q.task_done();
            }
        });

        queue.join().await;
        assert_eq!(queue.unfinished(), 0);
        assert!(queue.is_empty());
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_join_returns_immediately_when_empty() {
        let queue: TaskQueue<u32> = TaskQueue::new();
        tokio_test::assert_ready!(tokio_test::task::spawn(queue.join()).poll());
    }
}
