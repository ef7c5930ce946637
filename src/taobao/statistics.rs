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

use super::{types::LiveDetail, ChatContext, Error, Event, RoomStatistics};

/// Turns periodic room detail samples into statistics and entry events.
#[derive(Debug, Default, Clone)]
pub struct StatisticsTracker {
	last_join_count: Option<u64>
}

impl StatisticsTracker {
	pub async fn sample(&mut self, context: &ChatContext) -> Result<Vec<Event>, Error> {
		let detail = LiveDetail::fetch(&context.mtop, &context.live_id).await?;
		Ok(self.observe(&detail))
	}

	/// The first observation only establishes the baseline; entries are reported once the join count grows.
	pub fn observe(&mut self, detail: &LiveDetail) -> Vec<Event> {
		let mut events = Vec::with_capacity(2);
		let join_count = detail.join_count();
		if let (Some(previous), Some(current)) = (self.last_join_count, join_count) {
			if current > previous {
				events.push(Event::Entry {
					joined: current - previous,
					total: current
				});
			}
		}
		if join_count.is_some() {
			self.last_join_count = join_count;
		}
		events.push(Event::Statistics(RoomStatistics::from(detail)));
		events
	}
}
