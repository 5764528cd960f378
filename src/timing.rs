// 该文件是 Tingche （停车） 项目的一部分。
// src/timing.rs - 帧处理耗时统计
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{path::Path, time::Duration};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::info;

/// 每次迭代追加一条耗时记录，只增不减
#[derive(Debug, Default)]
pub struct TimingLog {
  times: Vec<Duration>,
  reported: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSummary {
  pub frames: usize,
  pub average: Duration,
  pub worst_case: Duration,
}

impl TimingLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&mut self, elapsed: Duration) {
    self.times.push(elapsed);
  }

  pub fn len(&self) -> usize {
    self.times.len()
  }

  pub fn is_empty(&self) -> bool {
    self.times.is_empty()
  }

  /// 平均与最坏耗时；没有记录时返回 `None`
  pub fn summary(&self) -> Option<TimingSummary> {
    let worst_case = self.times.iter().max().copied()?;
    let total: Duration = self.times.iter().sum();
    Some(TimingSummary {
      frames: self.times.len(),
      average: mean(total, self.times.len()),
      worst_case,
    })
  }

  /// 输出统计日志，多次调用只输出一次
  pub fn report(&mut self) -> Option<TimingSummary> {
    let summary = self.summary()?;
    if !self.reported {
      self.reported = true;
      info!("Frames processed: {}", summary.frames);
      info!(
        "Average Frame Computation Time: {:.4} seconds",
        summary.average.as_secs_f64()
      );
      info!(
        "Worst Case Frame Computation Time: {:.4} seconds",
        summary.worst_case.as_secs_f64()
      );
    }
    Some(summary)
  }
}

// 帧数超过 u32 范围时退回到浮点除法，不截断
fn mean(total: Duration, count: usize) -> Duration {
  match u32::try_from(count) {
    Ok(n) => total / n,
    Err(_) => total.div_f64(count as f64),
  }
}

impl TimingSummary {
  pub fn to_json(&self, finished_at: DateTime<Utc>) -> Value {
    json!({
      "frames": self.frames,
      "average_secs": self.average.as_secs_f64(),
      "worst_case_secs": self.worst_case.as_secs_f64(),
      "finished_at": finished_at.to_rfc3339(),
    })
  }

  pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
    let report = serde_json::to_string_pretty(&self.to_json(Utc::now()))?;
    std::fs::write(path, report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
  }

  #[test]
  fn empty_log_has_no_summary() {
    let mut log = TimingLog::new();
    assert!(log.summary().is_none());
    assert!(log.report().is_none());
  }

  #[test]
  fn mean_and_max() {
    let mut log = TimingLog::new();
    for v in [10, 30, 20, 40] {
      log.record(ms(v));
    }
    assert_eq!(log.len(), 4);
    let summary = log.summary().unwrap();
    assert_eq!(summary.frames, 4);
    assert_eq!(summary.average, ms(25));
    assert_eq!(summary.worst_case, ms(40));
  }

  #[test]
  fn mean_survives_counts_beyond_u32() {
    let count = u32::MAX as usize + 1;
    let total = ms(1) * 4096;
    let average = mean(total, count);
    assert!(average < ms(1));
    assert_eq!(average, total.div_f64(count as f64));
    assert_eq!(mean(ms(90), 3), ms(30));
  }

  #[test]
  fn report_is_idempotent() {
    let mut log = TimingLog::new();
    log.record(ms(5));
    let first = log.report();
    let second = log.report();
    assert_eq!(first, second);
  }

  #[test]
  fn json_report() {
    let summary = TimingSummary {
      frames: 2,
      average: ms(1500),
      worst_case: ms(2000),
    };
    let at = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
      .unwrap()
      .with_timezone(&Utc);
    let value = summary.to_json(at);
    assert_eq!(value["frames"], 2);
    assert_eq!(value["average_secs"], 1.5);
    assert_eq!(value["worst_case_secs"], 2.0);
    assert_eq!(value["finished_at"], "2026-01-02T03:04:05+00:00");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timing.json");
    summary.write_json(&path).unwrap();
    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["frames"], 2);
  }
}
