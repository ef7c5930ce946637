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

use std::{future, pin::Pin, time::Duration};

use futures_util::Stream;
use simd_json::OwnedValue;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

mod context;
mod error;
mod event;
mod heartbeat;
pub mod mtop;
mod statistics;
pub mod types;
mod util;
pub use self::{
	context::{ChatContext, ChatOptions, RoomState, RoomStatus},
	error::Error,
	event::{Event, HeartbeatAck, RoomStatistics, Status, User},
	heartbeat::Heartbeat,
	mtop::Credentials,
	statistics::StatisticsTracker
};
use self::types::CommentPage;

pub(crate) const H5API_BASE: &str = "https://h5api.m.taobao.com/h5/";
pub(crate) const LIVE_PAGE_BASE: &str = "https://tbzb.taobao.com/live";

pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36";

async fn tick(timer: &mut Option<Interval>) {
	match timer {
		Some(timer) => {
			timer.tick().await;
		}
		None => future::pending().await
	}
}

fn timer(period: Duration, delay_first: bool) -> Interval {
	let mut timer = if delay_first { time::interval_at(Instant::now() + period, period) } else { time::interval(period) };
	timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
	timer
}

/// Listens to a live room.
///
/// The returned stream interleaves chat messages, heartbeat acknowledgements and (unless disabled in
/// [`ChatOptions::statistics_interval`]) statistics and entry events, all driven from the task polling the stream. Comment
/// polls are paced by the delay the server asks for; the heartbeat fires immediately and then every
/// [`ChatOptions::heartbeat_interval`].
///
/// Errors are yielded as they happen. The stream ends after yielding an error for which [`Error::is_fatal`] is true.
///
/// ```no_run
/// use futures_util::StreamExt;
/// use taolive::taobao::{self, ChatContext};
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let context = ChatContext::new_from_live("518876609326").await?;
/// let mut stream = taobao::stream(&context).await?;
/// while let Some(event) = stream.next().await {
/// 	println!("{}", event?);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn stream(context: &ChatContext) -> Result<Pin<Box<dyn Stream<Item = Result<Event, Error>> + '_>>, Error> {
	let options = &context.options;
	let mut statistics = StatisticsTracker::default();
	let initial = match options.statistics_interval {
		Some(_) => statistics.sample(context).await?,
		None => Vec::new()
	};

	Ok(Box::pin(async_stream_lite::async_stream(move |yielder| async move {
		for event in initial {
			yielder.y(Ok(event)).await;
		}

		let mut heartbeat = Heartbeat::default();
		let mut heartbeat_timer = timer(options.heartbeat_interval, false);
		let mut statistics_timer = options.statistics_interval.map(|period| timer(period, true));
		let mut pagination_context: Option<OwnedValue> = None;
		let next_poll = time::sleep(Duration::ZERO);
		tokio::pin!(next_poll);

		loop {
			let error = tokio::select! {
				_ = &mut next_poll => {
					match CommentPage::fetch(&context.mtop, &context.topic, options.page_size, pagination_context.as_ref()).await {
						Ok(page) => {
							next_poll.as_mut().reset(Instant::now() + page.delay_or(options.default_poll_delay));
							pagination_context = page.pagination_context;
							if !page.comments.is_empty() {
								debug!(count = page.comments.len(), "received comments");
								yielder.y(Ok(Event::Received { count: page.comments.len() })).await;
							}
							for comment in page.comments {
								yielder.y(Ok(Event::from(comment))).await;
							}
							None
						}
						Err(e) => {
							next_poll.as_mut().reset(Instant::now() + options.default_poll_delay);
							Some(e)
						}
					}
				}
				_ = heartbeat_timer.tick() => {
					match heartbeat.beat(context).await {
						Ok(ack) => {
							yielder.y(Ok(Event::Heartbeat(ack))).await;
							None
						}
						Err(e) => Some(e)
					}
				}
				_ = tick(&mut statistics_timer) => {
					match statistics.sample(context).await {
						Ok(events) => {
							for event in events {
								yielder.y(Ok(event)).await;
							}
							None
						}
						Err(e) => Some(e)
					}
				}
			};

			if let Some(e) = error {
				let fatal = e.is_fatal();
				warn!("room {} poll failed: {e}", context.live_id);
				yielder.y(Err(e)).await;
				if fatal {
					break;
				}
			}
		}
	})))
}
