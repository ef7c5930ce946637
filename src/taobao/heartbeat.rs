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

use super::{
	mtop::MtopResponse,
	types::PullNativeMsg,
	util::now_millis,
	ChatContext, Error, HeartbeatAck
};
use crate::util::MapNonempty;

/// Keeps a room session alive by pulling the PowerMsg channel. Each pull advances the message offset.
#[derive(Debug, Clone)]
pub struct Heartbeat {
	offset: String
}

impl Default for Heartbeat {
	fn default() -> Self {
		Self::starting_at(now_millis())
	}
}

impl Heartbeat {
	pub fn starting_at(offset: impl Into<String>) -> Self {
		Self { offset: offset.into() }
	}

	pub fn offset(&self) -> &str {
		&self.offset
	}

	pub async fn beat(&mut self, context: &ChatContext) -> Result<HeartbeatAck, Error> {
		let referer = context.url()?;
		let response = PullNativeMsg::pull(&context.mtop, &context.topic, &self.offset, referer.as_str()).await?;
		Ok(self.acknowledge(response))
	}

	pub(crate) fn acknowledge(&mut self, response: MtopResponse<PullNativeMsg>) -> HeartbeatAck {
		let success = response.is_success();
		let ret = response.ret_code().map(str::to_string).nonempty_or("未知");
		let data = response.data.unwrap_or_default();
		let offset_before = self.offset.clone();
		if let Some(offset) = data.last_offset() {
			self.offset = offset.to_string();
		}
		HeartbeatAck {
			success,
			ret,
			notifications: data.timestamp_list.len(),
			offset_before,
			offset_after: self.offset.clone()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn response(json: &str) -> MtopResponse<PullNativeMsg> {
		let mut json = json.as_bytes().to_vec();
		simd_json::from_slice(&mut json).unwrap()
	}

	#[test]
	fn advances_offset_to_last_notification() {
		let mut heartbeat = Heartbeat::starting_at("1000");
		let ack = heartbeat.acknowledge(response(r#"{"ret":["SUCCESS::调用成功"],"data":{"timestampList":[{"offset":"1001"},{"offset":"1007"}]}}"#));
		assert!(ack.success);
		assert_eq!(ack.notifications, 2);
		assert_eq!(ack.offset_before, "1000");
		assert_eq!(ack.offset_after, "1007");
		assert_eq!(heartbeat.offset(), "1007");
	}

	#[test]
	fn keeps_offset_when_nothing_arrives() {
		let mut heartbeat = Heartbeat::starting_at("1000");
		let ack = heartbeat.acknowledge(response(r#"{"ret":["SUCCESS::调用成功"],"data":{"timestampList":[]}}"#));
		assert!(ack.success);
		assert_eq!(ack.notifications, 0);
		assert_eq!(heartbeat.offset(), "1000");
	}

	#[test]
	fn failures_are_acknowledged_not_raised() {
		let mut heartbeat = Heartbeat::starting_at("1000");
		let ack = heartbeat.acknowledge(response(r#"{"ret":["FAIL_SYS_SESSION_EXPIRED::Session过期"]}"#));
		assert!(!ack.success);
		assert_eq!(ack.ret, "FAIL_SYS_SESSION_EXPIRED::Session过期");

		let ack = heartbeat.acknowledge(response(r#"{}"#));
		assert!(!ack.success);
		assert_eq!(ack.ret, "未知");
	}

	#[test]
	fn default_offset_is_a_millisecond_timestamp() {
		let heartbeat = Heartbeat::default();
		assert_eq!(heartbeat.offset().len(), 13);
		assert!(heartbeat.offset().bytes().all(|c| c.is_ascii_digit()));
	}
}
