//! Property tests for capability matching, dispatch and the wire codecs.

use proptest::collection::vec;
use proptest::prelude::*;

use panther_capkernel::cap::{codec, is_authorized, CapabilityList, Request};
use panther_capkernel::host::memory::MemoryHost;
use panther_capkernel::table::codec as table_codec;
use panther_capkernel::{
    Capability, ErrorKind, Kernel, Location, ProcedureKey, ResultCode, Syscall, SyscallClass,
    SyscallError, Word,
};

fn name() -> impl Strategy<Value = ProcedureKey> {
    "[A-Za-z][A-Za-z0-9_]{0,23}".prop_map(|s| ProcedureKey::new(&s).unwrap())
}

fn word() -> impl Strategy<Value = Word> {
    any::<[u8; 32]>().prop_map(Word::from_bytes)
}

fn small_word() -> impl Strategy<Value = Word> {
    (0u64..64).prop_map(Word::from)
}

fn capability() -> impl Strategy<Value = Capability> {
    prop_oneof![
        (word(), word()).prop_map(|(a, s)| Capability::write(a, s)),
        vec(word(), 0..=4).prop_map(|scope| Capability::log(scope)),
        vec(name(), 0..4).prop_map(|scope| Capability::call(scope)),
        vec(name(), 0..4).prop_map(|scope| Capability::delete(scope)),
        Just(Capability::SetEntry),
        vec(name(), 0..4).prop_map(|scope| Capability::register(scope)),
    ]
}

fn list(caps: impl IntoIterator<Item = Capability>) -> CapabilityList {
    caps.into_iter().collect()
}

proptest! {
    #[test]
    fn write_range_is_exact(address in 0u64..1 << 40, size in 0u64..64, slot in 0u64..1 << 41) {
        let held = list([Capability::write(address, size)]);
        let slot_word = Word::from(slot);
        let expected = address <= slot && slot < address + size;
        prop_assert_eq!(is_authorized(&held, &Request::Write { address: &slot_word }), expected);
    }

    #[test]
    fn write_range_through_dispatch(address in 0u64..256, size in 0u64..16, slot in 0u64..512) {
        let mut kernel = Kernel::new(MemoryHost::new());
        let caller = ProcedureKey::new("writer").unwrap();
        kernel
            .create_procedure(caller, Location::from(1u64), [Capability::write(address, size)])
            .unwrap();

        let code = kernel.execute(
            &caller,
            Syscall::Write { address: Word::from(slot), value: Word::from(1u64) },
        );
        if address <= slot && slot < address + size {
            prop_assert_eq!(code, ResultCode::SUCCESS);
            prop_assert_eq!(kernel.host().slot(slot), Word::from(1u64));
        } else {
            prop_assert_eq!(
                code,
                SyscallError::rejected(SyscallClass::Write, ErrorKind::CapabilityDenied).code()
            );
            prop_assert_eq!(kernel.host().slots().count(), 0);
        }
    }

    #[test]
    fn log_wildcard_allows_up_to_four(topics in vec(word(), 0..=4)) {
        let held = list([Capability::log_any()]);
        let allowed = is_authorized(&held, &Request::Log { topics: &topics });
        prop_assert!(allowed);
    }

    #[test]
    fn log_scope_requires_exact_topics(
        scope in vec(small_word(), 1..=4),
        emitted in vec(small_word(), 0..=4),
    ) {
        let held = list([Capability::log(scope.clone())]);
        prop_assert_eq!(
            is_authorized(&held, &Request::Log { topics: &emitted }),
            emitted == scope
        );
        let exact = is_authorized(&held, &Request::Log { topics: &scope });
        prop_assert!(exact);
    }

    #[test]
    fn call_scope_is_exact(scope in vec(name(), 1..4), target in name()) {
        let held = list([Capability::call(scope.clone())]);
        prop_assert_eq!(
            is_authorized(&held, &Request::Call { target: &target }),
            scope.contains(&target)
        );
        let any = list([Capability::call_any()]);
        let wildcard = is_authorized(&any, &Request::Call { target: &target });
        prop_assert!(wildcard);
    }

    #[test]
    fn wildcard_delete_spares_only_the_entry(entry in name(), target in name()) {
        let held = list([Capability::delete_any()]);
        let allowed = is_authorized(
            &held,
            &Request::Delete { target: &target, entry: Some(&entry) },
        );
        prop_assert_eq!(allowed, target != entry);
    }

    #[test]
    fn capability_list_round_trips(caps in vec(capability(), 0..8)) {
        let words = codec::encode(&caps);
        prop_assert_eq!(codec::decode(&words).unwrap(), caps);
    }

    #[test]
    fn table_round_trips_after_deletes(
        names in proptest::collection::btree_set(name(), 1..8),
        caps in vec(capability(), 0..4),
        delete_mask in any::<u8>(),
    ) {
        // The hyphen keeps the admin name out of the generated set.
        let admin = ProcedureKey::new("admin-0").unwrap();
        let mut kernel = Kernel::new(MemoryHost::new());
        kernel
            .create_procedure(admin, Location::from(0u64), [Capability::delete_any()])
            .unwrap();
        let names: Vec<ProcedureKey> = names.into_iter().collect();
        for (i, key) in names.iter().enumerate() {
            kernel
                .create_procedure(*key, Location::from(i as u64 + 1), caps.clone())
                .unwrap();
        }
        for (i, key) in names.iter().enumerate() {
            if delete_mask & (1 << i) != 0 {
                let code = kernel.execute(&admin, Syscall::Delete { target: *key });
                prop_assert_eq!(code, ResultCode::SUCCESS);
                prop_assert!(kernel.lookup(key).is_none());
            }
        }
        prop_assert!(kernel.check_invariants().is_empty());

        let decoded = table_codec::decode(&table_codec::encode(kernel.table())).unwrap();
        prop_assert_eq!(decoded.list_procedures(), kernel.list_procedures());
    }
}
