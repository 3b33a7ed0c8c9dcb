//! End-to-end kernel scenarios: procedures deployed on an in-memory host,
//! driven through external invocations and syscalls.

use std::cell::RefCell;
use std::rc::Rc;

use panther_capkernel::cap::Capability;
use panther_capkernel::host::memory::MemoryHost;
use panther_capkernel::host::router::{arg, encode_words, Router};
use panther_capkernel::kernel::{Invocation, Kernel};
use panther_capkernel::table::codec;
use panther_capkernel::{
    Config, ErrorKind, Location, ProcedureKey, ResultCode, Selector, Syscall, SyscallClass,
    SyscallError, Word,
};

fn key(name: &str) -> ProcedureKey {
    ProcedureKey::new(name).unwrap()
}

fn sel(signature: &str) -> Selector {
    Selector::from_signature(signature)
}

fn rejected(class: SyscallClass, kind: ErrorKind) -> ResultCode {
    SyscallError::rejected(class, kind).code()
}

fn assert_invariants(kernel: &Kernel<MemoryHost>) {
    let violations = kernel.check_invariants();
    assert!(violations.is_empty(), "{:?}", violations);
}

/// `store(uint256)` writes its argument to 0x8000.
fn storer() -> Router<MemoryHost> {
    Router::<MemoryHost>::new().route("store(uint256)", |ctx, payload| {
        let value = arg(payload, 0)?;
        ctx.write(0x8000u64, value).map_err(|e| e.code())?;
        Ok(Vec::new())
    })
}

/// `run()` forwards `store(356)` to ProcB.
fn forwarder() -> Router<MemoryHost> {
    Router::<MemoryHost>::new().route("run()", |ctx, _| {
        let payload = encode_words(&[Word::from(356u64)]);
        ctx.call(key("ProcB"), sel("store(uint256)"), &payload)
            .map_err(|e| e.code())
    })
}

/// ProcA (entry) and ProcB deployed, storage 0x8000 preset to 3.
fn two_procedures(proc_a_caps: Vec<Capability>) -> Kernel<MemoryHost> {
    let mut host = MemoryHost::new().with_slot(0x8000u64, 3u64);
    let a = host.deploy(forwarder());
    let b = host.deploy(storer());

    let mut kernel = Kernel::new(host);
    kernel.bootstrap(key("ProcA"), a, proc_a_caps).unwrap();
    kernel
        .create_procedure(key("ProcB"), b, [Capability::write(0x8000u64, 2u64)])
        .unwrap();
    kernel
}

#[test]
fn scenario_call_then_write() {
    let mut kernel = two_procedures(vec![
        Capability::call([key("ProcB")]),
        Capability::write(0x8000u64, 2u64),
    ]);

    let result = kernel.invoke(Invocation::entry(sel("run()"), &[]));
    assert_eq!(result, Ok(Vec::new()));
    assert_eq!(kernel.host().slot(0x8000u64), Word::from(356u64));
    assert!(kernel.frames().is_empty());
    assert_invariants(&kernel);
}

#[test]
fn scenario_call_without_capability() {
    let mut kernel = two_procedures(vec![Capability::write(0x8000u64, 2u64)]);
    let denied = rejected(SyscallClass::Call, ErrorKind::CapabilityDenied);

    let result = kernel.invoke(Invocation::entry(sel("run()"), &[]));
    assert_eq!(result, Err(SyscallError::Reverted(denied)));
    assert_eq!(kernel.host().slot(0x8000u64), Word::from(3u64));

    let code = kernel.execute(
        &key("ProcA"),
        Syscall::Call {
            target: key("ProcB"),
            selector: sel("store(uint256)"),
            payload: encode_words(&[Word::from(356u64)]),
        },
    );
    assert_eq!(code, denied);
    assert_eq!(kernel.host().slot(0x8000u64), Word::from(3u64));
    assert_invariants(&kernel);
}

#[test]
fn scenario_delete_scoped() {
    let mut kernel = two_procedures(vec![Capability::delete([key("ProcB")])]);
    kernel
        .create_procedure(key("ProcC"), Location::from(0xc0u64), [])
        .unwrap();
    assert_eq!(kernel.list_procedures().len(), 3);

    let code = kernel.execute(&key("ProcA"), Syscall::Delete { target: key("ProcB") });
    assert_eq!(code, ResultCode::SUCCESS);
    assert_eq!(kernel.list_procedures(), [key("ProcA"), key("ProcC")]);
    assert!(kernel.lookup(&key("ProcB")).is_none());

    let code = kernel.execute(&key("ProcA"), Syscall::Delete { target: key("ProcC") });
    assert_eq!(code, rejected(SyscallClass::Delete, ErrorKind::CapabilityDenied));
    assert_eq!(kernel.list_procedures(), [key("ProcA"), key("ProcC")]);

    let code = kernel.execute(&key("ProcA"), Syscall::Delete { target: key("ProcB") });
    assert_eq!(code, rejected(SyscallClass::Delete, ErrorKind::NotFound));
    assert_invariants(&kernel);
}

#[test]
fn scenario_entry_cannot_be_deleted() {
    let mut kernel = two_procedures(vec![Capability::delete_any()]);
    kernel.add_capability(&key("ProcB"), Capability::delete_any()).unwrap();
    let protected = rejected(SyscallClass::Delete, ErrorKind::ProtectedTarget);

    assert_eq!(
        kernel.execute(&key("ProcA"), Syscall::Delete { target: key("ProcA") }),
        protected
    );
    assert_eq!(
        kernel.execute(&key("ProcB"), Syscall::Delete { target: key("ProcA") }),
        protected
    );
    assert!(kernel.list_procedures().contains(&key("ProcA")));
    assert_eq!(kernel.entry_procedure(), Some(&key("ProcA")));
    assert_invariants(&kernel);
}

#[test]
fn scenario_set_entry_to_unregistered_name() {
    let mut kernel = two_procedures(vec![Capability::SetEntry]);

    let code = kernel.execute(&key("ProcA"), Syscall::SetEntry { target: key("Later") });
    assert_eq!(code, ResultCode::SUCCESS);
    assert_eq!(kernel.entry_procedure(), Some(&key("Later")));

    // The stale pointer only fails once something is invoked through it.
    assert_eq!(
        kernel.invoke(Invocation::entry(sel("run()"), &[])),
        Err(SyscallError::rejected(SyscallClass::Call, ErrorKind::NotFound))
    );

    // With the entry moved away, ProcA is an ordinary procedure again.
    kernel.add_capability(&key("ProcB"), Capability::delete_any()).unwrap();
    assert_eq!(
        kernel.execute(&key("ProcB"), Syscall::Delete { target: key("ProcA") }),
        ResultCode::SUCCESS
    );
    assert_invariants(&kernel);
}

#[test]
fn scenario_six_procedure_chain() {
    const BASE: u64 = 0x9000;
    const CHAIN: usize = 6;

    let names: Vec<ProcedureKey> = (0..CHAIN).map(|i| key(&format!("Chain{}", i))).collect();
    let mut host = MemoryHost::new();
    let mut locations = Vec::new();
    for i in 0..CHAIN {
        let next = names.get(i + 1).copied();
        locations.push(host.deploy_fn(move |ctx, selector, _| {
            let own = BASE + i as u64;
            ctx.write(own, 100 + i as u64).map_err(|e| e.code())?;

            // A neighbour's slot is out of range and must be refused.
            let stray = ctx.execute(Syscall::Write {
                address: Word::from(own + 1),
                value: Word::from(0xdeadu64),
            });
            if stray != rejected(SyscallClass::Write, ErrorKind::CapabilityDenied) {
                return Err(ResultCode::REVERTED);
            }

            match next {
                Some(next) => ctx.call(next, selector, &[]).map_err(|e| e.code()),
                None => Ok(Vec::new()),
            }
        }));
    }

    let mut kernel = Kernel::new(host);
    for i in 0..CHAIN {
        let caps = [Capability::call_any(), Capability::write(BASE + i as u64, 1u64)];
        if i == 0 {
            kernel.bootstrap(names[i], locations[i], caps).unwrap();
        } else {
            kernel.create_procedure(names[i], locations[i], caps).unwrap();
        }
    }

    assert_eq!(kernel.invoke(Invocation::entry(sel("chain()"), &[])), Ok(Vec::new()));
    for i in 0..CHAIN as u64 {
        assert_eq!(kernel.host().slot(BASE + i), Word::from(100 + i));
    }
    assert_eq!(kernel.host().slots().count(), CHAIN);
    assert_invariants(&kernel);
}

#[test]
fn reentrant_calls_track_depth() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut host = MemoryHost::new();

    let log_a = Rc::clone(&seen);
    let a = host.deploy_fn(move |ctx, _, _| {
        log_a.borrow_mut().push((*ctx.key(), ctx.depth(), ctx.caller()));
        if ctx.depth() == 0 {
            ctx.call(key("B"), sel("bounce()"), &[]).map_err(|e| e.code())?;
        }
        Ok(Vec::new())
    });
    let log_b = Rc::clone(&seen);
    let b = host.deploy_fn(move |ctx, _, _| {
        log_b.borrow_mut().push((*ctx.key(), ctx.depth(), ctx.caller()));
        ctx.call(key("A"), sel("enter()"), &[]).map_err(|e| e.code())
    });

    let mut kernel = Kernel::new(host);
    kernel.bootstrap(key("A"), a, [Capability::call([key("B")])]).unwrap();
    kernel.create_procedure(key("B"), b, [Capability::call([key("A")])]).unwrap();

    assert!(kernel.invoke(Invocation::entry(sel("enter()"), &[])).is_ok());
    assert_eq!(
        *seen.borrow(),
        [
            (key("A"), 0, None),
            (key("B"), 1, Some(key("A"))),
            (key("A"), 2, Some(key("B"))),
        ]
    );
    assert!(kernel.frames().is_empty());
}

#[test]
fn call_depth_is_bounded() {
    let mut host = MemoryHost::new();
    let recurse = host.deploy_fn(|ctx, selector, _| {
        let own = *ctx.key();
        ctx.call(own, selector, &[]).map_err(|e| e.code())
    });
    let mut kernel = Kernel::with_config(host, Config::new().with_max_call_depth(3));
    kernel.bootstrap(key("loop"), recurse, [Capability::call_any()]).unwrap();

    let result = kernel.invoke(Invocation::entry(sel("go()"), &[]));
    assert_eq!(
        result,
        Err(SyscallError::Reverted(rejected(
            SyscallClass::Call,
            ErrorKind::CallDepthExceeded
        )))
    );
    assert!(kernel.frames().is_empty());
    assert_invariants(&kernel);
}

#[test]
fn callee_failure_passes_through_and_caller_continues() {
    let mut host = MemoryHost::new();
    let failing = host.deploy_fn(|_, _, _| Err(ResultCode::new(0x99)));
    let outer = host.deploy_fn(|ctx, _, _| {
        let err = ctx.call(key("fails"), sel("boom()"), &[]).unwrap_err();
        ctx.write(1u64, err.code().value() as u64).map_err(|e| e.code())?;
        Ok(Vec::new())
    });

    let mut kernel = Kernel::new(host);
    kernel
        .bootstrap(
            key("outer"),
            outer,
            [Capability::call_any(), Capability::write(1u64, 1u64)],
        )
        .unwrap();
    kernel.create_procedure(key("fails"), failing, []).unwrap();

    assert!(kernel.invoke(Invocation::entry(sel("run()"), &[])).is_ok());
    assert_eq!(kernel.host().slot(1u64), Word::from(0x99u64));
}

#[test]
fn callee_does_not_inherit_caller_authority() {
    // ProcA may write 0x8000 itself, ProcB may not.
    let mut host = MemoryHost::new().with_slot(0x8000u64, 3u64);
    let a = host.deploy(forwarder());
    let b = host.deploy(storer());
    let mut kernel = Kernel::new(host);
    kernel
        .bootstrap(
            key("ProcA"),
            a,
            [Capability::call_any(), Capability::write(0x8000u64, 1u64)],
        )
        .unwrap();
    kernel.create_procedure(key("ProcB"), b, []).unwrap();

    let result = kernel.invoke(Invocation::entry(sel("run()"), &[]));
    assert_eq!(
        result,
        Err(SyscallError::Reverted(rejected(
            SyscallClass::Write,
            ErrorKind::CapabilityDenied
        )))
    );
    assert_eq!(kernel.host().slot(0x8000u64), Word::from(3u64));
}

#[test]
fn unknown_selector_and_missing_module() {
    let mut kernel = two_procedures(vec![Capability::call_any()]);
    assert_eq!(
        kernel.invoke(Invocation::entry(sel("nothing()"), &[])),
        Err(SyscallError::Reverted(ResultCode::UNKNOWN_SELECTOR))
    );

    kernel
        .create_procedure(key("Ghost"), Location::from(0xdeadu64), [])
        .unwrap();
    assert_eq!(
        kernel.invoke(Invocation::to(key("Ghost"), sel("run()"), &[])),
        Err(SyscallError::rejected(SyscallClass::Call, ErrorKind::NotFound))
    );
    assert_eq!(
        kernel.execute(
            &key("ProcA"),
            Syscall::Call {
                target: key("Ghost"),
                selector: sel("run()"),
                payload: Vec::new(),
            }
        ),
        rejected(SyscallClass::Call, ErrorKind::NotFound)
    );
}

#[test]
fn register_narrows_authority() {
    let mut kernel = two_procedures(vec![
        Capability::register_any(),
        Capability::write(0x8000u64, 4u64),
    ]);
    let register = |name: &str, caps: Vec<Capability>| Syscall::Register {
        target: key(name),
        location: Location::from(0x77u64),
        capabilities: caps,
    };

    let code = kernel.execute(
        &key("ProcA"),
        register("child", vec![Capability::write(0x8001u64, 1u64)]),
    );
    assert_eq!(code, ResultCode::SUCCESS);
    assert_eq!(
        kernel.lookup(&key("child")).unwrap().capabilities().as_slice(),
        [Capability::write(0x8001u64, 1u64)]
    );

    let denied = rejected(SyscallClass::Register, ErrorKind::CapabilityDenied);
    assert_eq!(
        kernel.execute(&key("ProcA"), register("wide", vec![Capability::write(0x9000u64, 1u64)])),
        denied
    );
    assert_eq!(
        kernel.execute(&key("ProcA"), register("entry", vec![Capability::SetEntry])),
        denied
    );
    assert_eq!(
        kernel.execute(&key("ProcA"), register("child", Vec::new())),
        rejected(SyscallClass::Register, ErrorKind::DuplicateKey)
    );
    assert_eq!(
        kernel.execute(&key("ProcB"), register("other", Vec::new())),
        rejected(SyscallClass::Register, ErrorKind::CapabilityDenied)
    );
    assert!(kernel.lookup(&key("wide")).is_none());
    assert_invariants(&kernel);
}

#[test]
fn log_scopes() {
    let t1 = Word::from(1u64);
    let t2 = Word::from(2u64);
    let mut kernel = two_procedures(vec![Capability::log([t1])]);
    let log = |topics: Vec<Word>| Syscall::Log {
        topics,
        data: b"hello".to_vec(),
    };

    assert_eq!(kernel.execute(&key("ProcA"), log(vec![t1])), ResultCode::SUCCESS);
    assert_eq!(
        kernel.execute(&key("ProcA"), log(vec![t2])),
        rejected(SyscallClass::Log, ErrorKind::CapabilityDenied)
    );
    assert_eq!(
        kernel.execute(&key("ProcA"), log(vec![t1; 5])),
        rejected(SyscallClass::Log, ErrorKind::InvalidArgument)
    );

    let events = kernel.host().events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].topics, [t1]);
    assert_eq!(events[0].data, b"hello");
}

#[test]
fn unknown_caller_is_rejected() {
    let mut kernel = two_procedures(vec![Capability::SetEntry]);
    let code = kernel.execute(&key("Nobody"), Syscall::SetEntry { target: key("Nobody") });
    assert_eq!(code, rejected(SyscallClass::SetEntry, ErrorKind::UnknownCaller));
    assert_eq!(kernel.entry_procedure(), Some(&key("ProcA")));
}

#[test]
fn rejections_leave_state_unchanged() {
    let mut kernel = two_procedures(vec![
        Capability::call([key("ProcB")]),
        Capability::delete([key("ProcB")]),
        Capability::write(0x8000u64, 1u64),
    ]);
    let table_before = codec::encode(kernel.table());
    let slots_before: Vec<(Word, Word)> =
        kernel.host().slots().map(|(k, v)| (*k, *v)).collect();

    let attempts = [
        Syscall::Write {
            address: Word::from(0x8001u64),
            value: Word::from(1u64),
        },
        Syscall::Delete { target: key("ProcA") },
        Syscall::SetEntry { target: key("ProcB") },
        Syscall::Log {
            topics: Vec::new(),
            data: Vec::new(),
        },
        Syscall::Register {
            target: key("ProcC"),
            location: Location::from(1u64),
            capabilities: Vec::new(),
        },
        Syscall::Call {
            target: key("ProcC"),
            selector: sel("run()"),
            payload: Vec::new(),
        },
    ];
    for syscall in attempts {
        assert!(!kernel.execute(&key("ProcA"), syscall).is_success());
    }

    let slots_after: Vec<(Word, Word)> = kernel.host().slots().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(codec::encode(kernel.table()), table_before);
    assert_eq!(slots_after, slots_before);
    assert_eq!(kernel.entry_procedure(), Some(&key("ProcA")));
    assert!(kernel.host().events().is_empty());
}

#[test]
fn table_snapshot_round_trips() {
    let kernel = two_procedures(vec![
        Capability::call([key("ProcB")]),
        Capability::write(0x8000u64, 2u64),
        Capability::log_any(),
    ]);
    let words = codec::encode(kernel.table());
    let decoded = codec::decode(&words).unwrap();
    assert_eq!(decoded.list_procedures(), kernel.list_procedures());
    for record in kernel.table().iter() {
        assert_eq!(decoded.lookup(record.key()), Some(record));
    }
}
