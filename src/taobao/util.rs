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

use std::future::Future;

use reqwest::Response;
use serde::de::DeserializeOwned;

use super::Error;

/// Strips the `callback(...)` wrapper from a JSONP body. Bare JSON objects pass through untouched.
pub fn unwrap_jsonp(body: &str) -> Result<&str, Error> {
	let body = body.trim();
	if body.starts_with('{') {
		return Ok(body);
	}
	match (body.find('('), body.rfind(')')) {
		(Some(start), Some(end)) if start < end => Ok(&body[start + 1..end]),
		_ => Err(Error::MalformedJsonp)
	}
}

pub trait JsonpResponseBody {
	fn jsonp<T: DeserializeOwned>(self) -> impl Future<Output = Result<T, Error>>;
}

impl JsonpResponseBody for Response {
	async fn jsonp<T: DeserializeOwned>(self) -> Result<T, Error> {
		let text = self.error_for_status()?.text().await?;
		let mut json = unwrap_jsonp(&text)?.as_bytes().to_vec();
		Ok(simd_json::from_slice(&mut json)?)
	}
}

pub fn now_millis() -> String {
	chrono::Utc::now().timestamp_millis().to_string()
}

#[cfg(test)]
mod tests {
	use super::unwrap_jsonp;
	use crate::taobao::Error;

	#[test]
	fn strips_callback_wrapper() {
		let body = r#"mtopjsonp42({"api":"mtop.taobao.iliad.comment.query.latest","ret":["SUCCESS::调用成功"],"data":{}})"#;
		assert_eq!(unwrap_jsonp(body).unwrap(), r#"{"api":"mtop.taobao.iliad.comment.query.latest","ret":["SUCCESS::调用成功"],"data":{}}"#);
	}

	#[test]
	fn keeps_parentheses_inside_payload() {
		let body = " mtopjsonp7({\"data\":{\"content\":\"(hi)\"}})\n";
		assert_eq!(unwrap_jsonp(body).unwrap(), "{\"data\":{\"content\":\"(hi)\"}}");
	}

	#[test]
	fn accepts_bare_json() {
		assert_eq!(unwrap_jsonp("{\"ret\":[]}").unwrap(), "{\"ret\":[]}");
	}

	#[test]
	fn rejects_garbage() {
		assert!(matches!(unwrap_jsonp("<html>blocked</html>"), Err(Error::MalformedJsonp)));
		assert!(matches!(unwrap_jsonp(")("), Err(Error::MalformedJsonp)));
	}
}
