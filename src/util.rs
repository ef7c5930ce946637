// Copyright 2024 pyke.io
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

pub trait MapNonempty {
	type T;

	fn and_then_nonempty<B, F>(self, f: F) -> Option<B>
	where
		Self: Sized,
		F: FnOnce(Self::T) -> Option<B>;

	fn nonempty_or(self, fallback: &str) -> String;
}

impl MapNonempty for String {
	type T = String;

	fn and_then_nonempty<B, F>(self, f: F) -> Option<B>
	where
		Self: Sized,
		F: FnOnce(Self::T) -> Option<B>
	{
		if self.is_empty() { None } else { f(self) }
	}

	fn nonempty_or(self, fallback: &str) -> String {
		if self.is_empty() { fallback.to_string() } else { self }
	}
}

impl MapNonempty for Option<String> {
	type T = String;

	fn and_then_nonempty<B, F>(self, f: F) -> Option<B>
	where
		Self: Sized,
		F: FnOnce(Self::T) -> Option<B>
	{
		self.and_then(|c| c.and_then_nonempty(f))
	}

	fn nonempty_or(self, fallback: &str) -> String {
		self.unwrap_or_default().nonempty_or(fallback)
	}
}

#[cfg(test)]
mod tests {
	use super::MapNonempty;

	#[test]
	fn empty_strings_count_as_missing() {
		assert_eq!(String::new().and_then_nonempty(Some), None);
		assert_eq!(Some("x".to_string()).and_then_nonempty(Some), Some("x".to_string()));
		assert_eq!(Some(String::new()).nonempty_or("匿名"), "匿名");
		assert_eq!(None::<String>.nonempty_or("未知"), "未知");
		assert_eq!("t**1".to_string().nonempty_or("匿名"), "t**1");
	}
}
