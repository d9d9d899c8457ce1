/*
 * Copyright 2020 Nikhil Marathe <nsm.nikhil@gmail.com>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use proptest::prelude::*;

use super::{
    interface::Rebuilder,
    rebuilder::{Dirtiness, MTimeRebuilder, MTimeState},
};
use bake_graph::{Action, Invocation, Key, Rule};
use std::{cell::RefCell, collections::HashMap, time::SystemTime};

fn dirtiness_strategy() -> impl Strategy<Value = Dirtiness> {
    prop_oneof![
        Just(Dirtiness::Dirty),
        Just(Dirtiness::DoesNotExist),
        any::<SystemTime>().prop_map(Dirtiness::Modified),
    ]
}

struct MapMTimeState {
    map: RefCell<HashMap<Key, Dirtiness>>,
}

impl MTimeState for MapMTimeState {
    fn modified(&self, key: &Key) -> std::io::Result<Dirtiness> {
        if let Some(d) = self.map.borrow().get(key) {
            Ok(*d)
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "not found",
            ))
        }
    }
}

proptest! {
    #[test]
    fn rebuilder_matches_mtime_contract(input in dirtiness_strategy(), target in dirtiness_strategy()) {
        let mut mtimes = HashMap::new();
        mtimes.insert(Key::path("foo.c"), input);
        mtimes.insert(Key::path("foo"), target);
        let state = MapMTimeState { map: RefCell::new(mtimes) };
        let rebuilder = MTimeRebuilder::new(state);
        let rule = Rule::new(
            vec![Key::path("foo.c")],
            Action::Invoke(Invocation::new("cc").arg("-c").arg("foo.c")),
        );
        let maybe_task = rebuilder.build(Key::path("foo"), &rule);
        match (input, target) {
            (Dirtiness::DoesNotExist, _) => { maybe_task.expect_err("missing input"); },
            (Dirtiness::Dirty, _) => {
                assert!(maybe_task.expect("not an error").expect("stale").is_command());
            },
            (Dirtiness::Modified(a), Dirtiness::Modified(b)) => {
                let maybe_task = maybe_task.expect("not an error");
                if a > b {
                    assert!(maybe_task.expect("newer input means stale").is_command());
                } else {
                    assert!(maybe_task.is_none(), "input not newer, no rebuild expected");
                }
            },
            (Dirtiness::Modified(_), _) => {
                assert!(maybe_task.expect("not an error").expect("stale").is_command());
            },
        }
    }
}
