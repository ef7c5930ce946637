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

//! Signed calls against the mtop H5 gateway.

use std::sync::Arc;

use md5::{Digest, Md5};
use rand::Rng;
use reqwest::{
	cookie::{CookieStore, Jar},
	header::{self, HeaderMap, HeaderValue}
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};
use url::{Host, Url};

use super::{
	util::{now_millis, JsonpResponseBody},
	ChatOptions, Error
};

pub(crate) const JSV: &str = "2.7.2";

pub(crate) const TOKEN_COOKIE: &str = "_m_h5_tk";
pub(crate) const TOKEN_ENC_COOKIE: &str = "_m_h5_tk_enc";

/// `ret` codes after which the gateway has issued a fresh token cookie and the call may be re-signed.
const TOKEN_REFRESH_CODES: [&str; 3] = ["FAIL_SYS_TOKEN_EMPTY", "FAIL_SYS_TOKEN_EXOIRED", "FAIL_SYS_ILLEGAL_ACCESS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Api {
	pub name: &'static str,
	pub version: &'static str,
	pub app_key: &'static str
}

pub const COMMENTS: Api = Api {
	name: "mtop.taobao.iliad.comment.query.latest",
	version: "1.0",
	app_key: "34675810"
};

pub const POWERMSG_PULL: Api = Api {
	name: "mtop.taobao.powermsg.h5.msg.pullnativemsg",
	version: "1.0",
	app_key: "12574478"
};

pub const LIVE_DETAIL: Api = Api {
	name: "mtop.mediaplatform.live.livedetail",
	version: "4.0",
	app_key: "12574478"
};

/// Session cookies required to sign mtop calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
	pub m_h5_tk: String,
	pub m_h5_tk_enc: String
}

impl Credentials {
	/// The signing token, i.e. everything in `_m_h5_tk` before the first underscore.
	pub fn token(&self) -> &str {
		token_from_cookie(&self.m_h5_tk)
	}
}

pub(crate) fn token_from_cookie(m_h5_tk: &str) -> &str {
	m_h5_tk.split_once('_').map_or(m_h5_tk, |(token, _)| token)
}

/// The registrable domain the gateway scopes session cookies to, e.g. `taobao.com` for `h5api.m.taobao.com`. Hosts that
/// are IP addresses or single labels get host-only cookies.
fn cookie_domain(base: &Url) -> Option<String> {
	match base.host()? {
		Host::Domain(host) => {
			let mut labels = host.rsplit('.');
			let tld = labels.next()?;
			let name = labels.next()?;
			Some(format!("{name}.{tld}"))
		}
		Host::Ipv4(_) | Host::Ipv6(_) => None
	}
}

pub fn sign(token: &str, t: &str, app_key: &str, data: &str) -> String {
	hex::encode(Md5::digest(format!("{token}&{t}&{app_key}&{data}").as_bytes()))
}

#[derive(Deserialize, Debug)]
pub struct MtopResponse<T> {
	#[serde(default)]
	pub api: Option<String>,
	#[serde(default)]
	pub ret: Vec<String>,
	pub data: Option<T>
}

impl<T> MtopResponse<T> {
	pub fn ret_code(&self) -> Option<&str> {
		self.ret.first().map(String::as_str)
	}

	pub fn is_success(&self) -> bool {
		self.ret_code().is_some_and(|ret| ret.starts_with("SUCCESS"))
	}

	pub fn needs_token(&self) -> bool {
		self.ret_code().is_some_and(|ret| TOKEN_REFRESH_CODES.iter().any(|code| ret.starts_with(code)))
	}

	pub fn into_data(self, api: &Api) -> Result<T, Error> {
		if !self.is_success() {
			return Err(Error::Mtop {
				api: api.name,
				ret: self.ret.into_iter().next().unwrap_or_default()
			});
		}
		self.data.ok_or_else(|| Error::Mtop {
			api: api.name,
			ret: "missing data".to_string()
		})
	}
}

/// An HTTP client bound to one cookie jar, so every call is signed with the session's current token.
#[derive(Debug, Clone)]
pub(crate) struct MtopClient {
	http: reqwest::Client,
	jar: Arc<Jar>,
	base: Url
}

impl MtopClient {
	pub fn new(options: &ChatOptions) -> Result<Self, Error> {
		let mut headers = HeaderMap::new();
		headers.append(header::ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.5"));
		headers.append(header::REFERER, HeaderValue::from_static("https://tbzb.taobao.com/"));
		if let Ok(user_agent) = HeaderValue::from_str(&options.user_agent) {
			headers.append(header::USER_AGENT, user_agent);
		}

		let jar = Arc::new(Jar::default());
		let http = reqwest::Client::builder()
			.default_headers(headers)
			.cookie_provider(Arc::clone(&jar))
			.timeout(options.request_timeout)
			.build()?;
		Ok(Self {
			http,
			jar,
			base: Url::parse(&options.h5api_base)?
		})
	}

	pub fn http(&self) -> &reqwest::Client {
		&self.http
	}

	pub fn cookie(&self, name: &str) -> Option<String> {
		let cookies = self.jar.cookies(&self.base)?;
		cookies.to_str().ok()?.split(';').find_map(|pair| {
			let (key, value) = pair.trim().split_once('=')?;
			(key == name).then(|| value.to_string())
		})
	}

	/// Stores a session cookie the way the gateway scopes its own, so a refreshed `Set-Cookie` replaces it instead of
	/// sitting next to it.
	pub fn set_cookie(&self, name: &str, value: &str) {
		let cookie = match cookie_domain(&self.base) {
			Some(domain) => format!("{name}={value}; Domain={domain}; Path=/"),
			None => format!("{name}={value}; Path=/")
		};
		self.jar.add_cookie_str(&cookie, &self.base);
	}

	pub fn credentials(&self) -> Option<Credentials> {
		Some(Credentials {
			m_h5_tk: self.cookie(TOKEN_COOKIE)?,
			m_h5_tk_enc: self.cookie(TOKEN_ENC_COOKIE)?
		})
	}

	pub fn endpoint(&self, api: &Api) -> Result<Url, Error> {
		Ok(self.base.join(&format!("{}/{}/", api.name, api.version))?)
	}

	pub async fn call<D, T>(&self, api: &Api, data: &D, headers: HeaderMap) -> Result<T, Error>
	where
		D: Serialize + ?Sized,
		T: DeserializeOwned
	{
		self.call_raw(api, data, headers).await?.into_data(api)
	}

	/// Like [`MtopClient::call`], but hands back the envelope even when `ret` isn't a success.
	pub async fn call_raw<D, T>(&self, api: &Api, data: &D, headers: HeaderMap) -> Result<MtopResponse<T>, Error>
	where
		D: Serialize + ?Sized,
		T: DeserializeOwned
	{
		let data = simd_json::to_string(data)?;
		let response: MtopResponse<T> = self.call_once(api, &data, headers.clone()).await?;
		if response.needs_token() {
			warn!(api = api.name, ret = response.ret_code(), "mtop token rejected, retrying with refreshed cookie");
			return self.call_once(api, &data, headers).await;
		}
		Ok(response)
	}

	async fn call_once<T: DeserializeOwned>(&self, api: &Api, data: &str, headers: HeaderMap) -> Result<MtopResponse<T>, Error> {
		let t = now_millis();
		let token = self.cookie(TOKEN_COOKIE).unwrap_or_default();
		let sign = sign(token_from_cookie(&token), &t, api.app_key, data);
		let callback = format!("mtopjsonp{}", rand::rng().random_range(1..=100));
		let url = Url::parse_with_params(self.endpoint(api)?.as_str(), [
			("jsv", JSV),
			("appKey", api.app_key),
			("t", t.as_str()),
			("sign", sign.as_str()),
			("api", api.name),
			("v", api.version),
			("preventFallback", "true"),
			("type", "jsonp"),
			("dataType", "jsonp"),
			("callback", callback.as_str()),
			("data", data)
		])?;
		debug!(api = api.name, t = %t, "mtop request");
		let response: MtopResponse<T> = self.http.get(url).headers(headers).send().await?.jsonp().await?;
		debug!(api = api.name, ret = response.ret_code(), "mtop response");
		Ok(response)
	}
}

#[cfg(test)]
mod tests {
	use simd_json::OwnedValue;

	use super::*;

	#[test]
	fn signs_like_the_h5_sdk() {
		assert_eq!(sign("abc123", "1715600000000", "12574478", r#"{"liveId":"518876609326"}"#), "845bd48a0f084ebd4000c6836d955bc5");
		// no token yet; the first call of a session is signed with an empty token
		assert_eq!(sign("", "1", "34675810", "{}"), "d59600f3f5772d5724e81c13e9f801e0");
	}

	#[test]
	fn token_is_cookie_prefix() {
		assert_eq!(token_from_cookie("9b1e5b1f3c2d_1715600000000"), "9b1e5b1f3c2d");
		assert_eq!(token_from_cookie("notimestamp"), "notimestamp");
		let credentials = Credentials {
			m_h5_tk: "abc_1_2".to_string(),
			m_h5_tk_enc: "enc".to_string()
		};
		assert_eq!(credentials.token(), "abc");
	}

	#[test]
	fn classifies_ret_codes() {
		let mut json = r#"{"api":"mtop.mediaplatform.live.livedetail","ret":["FAIL_SYS_TOKEN_EMPTY::令牌为空"],"data":{}}"#.as_bytes().to_vec();
		let response: MtopResponse<OwnedValue> = simd_json::from_slice(&mut json).unwrap();
		assert!(response.needs_token());
		assert!(!response.is_success());
		match response.into_data(&LIVE_DETAIL) {
			Err(Error::Mtop { api, ret }) => {
				assert_eq!(api, LIVE_DETAIL.name);
				assert_eq!(ret, "FAIL_SYS_TOKEN_EMPTY::令牌为空");
			}
			other => panic!("unexpected {other:?}")
		}

		let mut json = r#"{"ret":["SUCCESS::调用成功"],"data":{"topic":"abc"}}"#.as_bytes().to_vec();
		let response: MtopResponse<OwnedValue> = simd_json::from_slice(&mut json).unwrap();
		assert!(response.is_success());
		assert!(!response.needs_token());
		assert!(response.into_data(&LIVE_DETAIL).is_ok());
	}

	#[test]
	fn endpoints_nest_under_base() {
		let client = MtopClient::new(&ChatOptions::default()).unwrap();
		assert_eq!(
			client.endpoint(&POWERMSG_PULL).unwrap().as_str(),
			"https://h5api.m.taobao.com/h5/mtop.taobao.powermsg.h5.msg.pullnativemsg/1.0/"
		);
	}

	#[test]
	fn session_cookies_share_the_gateway_domain() {
		assert_eq!(cookie_domain(&Url::parse("https://h5api.m.taobao.com/h5/").unwrap()).as_deref(), Some("taobao.com"));
		assert_eq!(cookie_domain(&Url::parse("http://127.0.0.1:8080/h5/").unwrap()), None);
		assert_eq!(cookie_domain(&Url::parse("http://localhost/h5/").unwrap()), None);
	}

	#[test]
	fn refreshed_token_replaces_manual_one() {
		let client = MtopClient::new(&ChatOptions::default()).unwrap();
		client.set_cookie(TOKEN_COOKIE, "old_1");
		client.jar.add_cookie_str("_m_h5_tk=new_2; Domain=taobao.com; Path=/", &client.base);
		assert_eq!(client.cookie(TOKEN_COOKIE).as_deref(), Some("new_2"));

		let header = client.jar.cookies(&client.base).unwrap();
		assert_eq!(header.to_str().unwrap().matches("_m_h5_tk=").count(), 1);
	}

	#[test]
	fn reads_back_session_cookies() {
		let client = MtopClient::new(&ChatOptions::default()).unwrap();
		assert!(client.credentials().is_none());
		client.set_cookie(TOKEN_COOKIE, "abc_1715600000000");
		client.set_cookie(TOKEN_ENC_COOKIE, "xyz");
		assert_eq!(
			client.credentials(),
			Some(Credentials {
				m_h5_tk: "abc_1715600000000".to_string(),
				m_h5_tk_enc: "xyz".to_string()
			})
		);
	}
}
