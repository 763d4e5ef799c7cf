// Copyright Materialize, Inc. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository, or online at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::iter::{self, Chain, Once};

/// Extension methods for iterators over path segments.
pub trait StrIteratorExt<'a>: IntoIterator<Item = &'a str> + Sized {
    /// Appends a single segment.
    fn chain_one(self, segment: &'a str) -> Chain<Self::IntoIter, Once<&'a str>> {
        self.into_iter().chain(iter::once(segment))
    }
}

impl<'a, I> StrIteratorExt<'a> for I where I: IntoIterator<Item = &'a str> {}
