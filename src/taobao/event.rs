// Copyright 2025 pyke.io
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// 	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{Comment, LiveDetail};
use crate::util::MapNonempty;

const ANONYMOUS_NICK: &str = "匿名";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
	/// The publisher's numeric user ID, as a string. May be empty for anonymized viewers.
	pub id: String,
	/// The viewer's nickname. The platform masks most of it, e.g. `t**1`.
	pub name: String
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoomStatistics {
	/// Viewers currently in the room.
	pub online: Option<u64>,
	/// Cumulative views since the stream started.
	pub total_views: Option<u64>,
	pub likes: Option<u64>
}

impl From<&LiveDetail> for RoomStatistics {
	fn from(detail: &LiveDetail) -> Self {
		Self {
			online: detail.online_count,
			total_views: detail.view_count.or(detail.total_join_count),
			likes: detail.praise_count
		}
	}
}

/// The outcome of one keep-alive pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatAck {
	pub success: bool,
	/// The raw `ret` code reported by the gateway.
	pub ret: String,
	/// Number of message notifications the pull reported.
	pub notifications: usize,
	pub offset_before: String,
	pub offset_after: String
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
	/// A comment poll returned this many new messages; their `Chat` events follow.
	Received { count: usize },
	/// A chat message posted in the room.
	Chat {
		id: String,
		user: User,
		content: String,
		timestamp: Option<DateTime<Utc>>
	},
	/// Viewers who entered the room since the previous statistics sample.
	Entry { joined: u64, total: u64 },
	Statistics(RoomStatistics),
	Heartbeat(HeartbeatAck)
}

impl From<Comment> for Event {
	fn from(comment: Comment) -> Self {
		Event::Chat {
			id: comment.comment_id,
			user: User {
				id: comment.publisher_id,
				name: comment.publisher_nick.nonempty_or(ANONYMOUS_NICK)
			},
			content: comment.content,
			timestamp: comment.timestamp.and_then(DateTime::from_timestamp_millis)
		}
	}
}

struct Count(Option<u64>);

impl fmt::Display for Count {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.0 {
			Some(n) => write!(f, "{n}"),
			None => f.write_str("-")
		}
	}
}

impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Event::Received { count } => write!(f, "{}", Status::Info(format!("收到 {count} 条新消息"))),
			Event::Chat { user, content, .. } => write!(f, "【聊天msg】{}: {}", user.name, content),
			Event::Entry { joined, total } => write!(f, "【进场msg】{joined} 人进入直播间 (累计 {total})"),
			Event::Statistics(stats) => {
				write!(f, "【统计msg】在线人数: {}, 累计观看: {}, 点赞: {}", Count(stats.online), Count(stats.total_views), Count(stats.likes))
			}
			Event::Heartbeat(ack) => {
				if ack.success && ack.notifications > 0 {
					write!(f, "【心跳】收到 {} 条消息通知，offset: {} -> {}", ack.notifications, ack.offset_before, ack.offset_after)
				} else {
					write!(f, "【心跳】状态: {} - {}", if ack.success { "成功" } else { "失败" }, ack.ret)
				}
			}
		}
	}
}

/// A connection status line, as printed around the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
	Info(String),
	Success(String),
	Failure(String)
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Status::Info(message) => write!(f, "【i】{message}"),
			Status::Success(message) => write!(f, "【√】{message}"),
			Status::Failure(message) => write!(f, "【X】{message}")
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ack(success: bool, notifications: usize) -> HeartbeatAck {
		HeartbeatAck {
			success,
			ret: if success { "SUCCESS::调用成功".to_string() } else { "FAIL_SYS_TOKEN_EXOIRED::令牌过期".to_string() },
			notifications,
			offset_before: "100".to_string(),
			offset_after: "105".to_string()
		}
	}

	#[test]
	fn chat_line_falls_back_to_anonymous() {
		let event = Event::from(Comment {
			comment_id: "1".to_string(),
			publisher_nick: String::new(),
			publisher_id: "42".to_string(),
			content: "有链接吗".to_string(),
			timestamp: Some(1_747_200_000_000)
		});
		assert_eq!(event.to_string(), "【聊天msg】匿名: 有链接吗");
		match event {
			Event::Chat { user, timestamp, .. } => {
				assert_eq!(user.id, "42");
				assert_eq!(timestamp.map(|t| t.timestamp_millis()), Some(1_747_200_000_000));
			}
			_ => unreachable!()
		}
	}

	#[test]
	fn batch_notice_is_an_info_line() {
		assert_eq!(Event::Received { count: 2 }.to_string(), "【i】收到 2 条新消息");
	}

	#[test]
	fn entry_and_statistics_lines() {
		assert_eq!(Event::Entry { joined: 3, total: 1003 }.to_string(), "【进场msg】3 人进入直播间 (累计 1003)");
		let stats = RoomStatistics {
			online: Some(120),
			total_views: Some(56789),
			likes: None
		};
		assert_eq!(Event::Statistics(stats).to_string(), "【统计msg】在线人数: 120, 累计观看: 56789, 点赞: -");
	}

	#[test]
	fn heartbeat_lines() {
		assert_eq!(Event::Heartbeat(ack(true, 5)).to_string(), "【心跳】收到 5 条消息通知，offset: 100 -> 105");
		assert_eq!(Event::Heartbeat(ack(true, 0)).to_string(), "【心跳】状态: 成功 - SUCCESS::调用成功");
		assert_eq!(Event::Heartbeat(ack(false, 0)).to_string(), "【心跳】状态: 失败 - FAIL_SYS_TOKEN_EXOIRED::令牌过期");
	}

	#[test]
	fn status_lines() {
		assert_eq!(Status::Info("监听已启动".to_string()).to_string(), "【i】监听已启动");
		assert_eq!(Status::Success("ok".to_string()).to_string(), "【√】ok");
		assert_eq!(Status::Failure("boom".to_string()).to_string(), "【X】boom");
	}

	#[test]
	fn events_serialize_with_type_tag() {
		let json = simd_json::to_string(&Event::Entry { joined: 2, total: 10 }).unwrap();
		assert_eq!(json, r#"{"type":"entry","joined":2,"total":10}"#);
	}
}
