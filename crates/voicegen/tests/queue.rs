//! Queue behavior across independent store handles on one SQLite file.

mod common;

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use common::{ScriptedSynthesizer, StoreLock, TestHarness};
use voicegen::db::job_repo;
use voicegen::worker::ORPHANED_JOB_MESSAGE;
use voicegen::{JobStatus, WorkOutcome};

#[test]
fn test_hello_end_to_end() {
    let harness = TestHarness::new();
    let producer = harness.database();
    let mut worker = harness.worker(Box::new(ScriptedSynthesizer::new()));

    let job = job_repo::create(&producer, "Hello").unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let outcome = worker.run_once().unwrap();
    assert_eq!(
        outcome,
        WorkOutcome::Succeeded {
            job_id: job.id,
            audio_path: format!("audio/{}.wav", job.id),
        }
    );

    let done = job_repo::get(&producer, job.id).unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Success);
    assert!(done.error_message.is_none());
    assert!(done.duration_ms.unwrap() >= 1);

    let started = done.started_at.unwrap();
    let completed = done.completed_at.unwrap();
    assert!(done.created_at <= started);
    assert!(started <= completed);

    let wav = harness.public_dir.join(done.audio_path.unwrap());
    let reader = hound::WavReader::open(&wav).unwrap();
    assert_eq!(reader.spec().channels, 1);
    assert!(reader.len() > 0);

    assert_eq!(worker.run_once().unwrap(), WorkOutcome::Idle);
}

#[test]
fn test_backend_failure_then_next_job_succeeds() {
    let harness = TestHarness::new();
    let producer = harness.database();
    let mut worker = harness.worker(Box::new(ScriptedSynthesizer::failing_on("crash")));

    let bad = job_repo::create(&producer, "crash please").unwrap();
    let good = job_repo::create(&producer, "all good").unwrap();

    assert!(matches!(
        worker.run_once().unwrap(),
        WorkOutcome::Failed { job_id, .. } if job_id == bad.id
    ));
    assert!(matches!(
        worker.run_once().unwrap(),
        WorkOutcome::Succeeded { job_id, .. } if job_id == good.id
    ));

    let bad = job_repo::get(&producer, bad.id).unwrap().unwrap();
    assert_eq!(bad.status, JobStatus::Error);
    assert!(bad.error_message.unwrap().contains("voice model crashed"));
    assert!(bad.audio_path.is_none());
    assert!(bad.completed_at.is_some());

    let good = job_repo::get(&producer, good.id).unwrap().unwrap();
    assert_eq!(good.status, JobStatus::Success);
}

#[test]
fn test_jobs_are_claimed_in_submission_order() {
    let harness = TestHarness::new();
    let producer = harness.database();
    let consumer = harness.database();

    let a = job_repo::create(&producer, "a").unwrap();
    let b = job_repo::create(&producer, "b").unwrap();
    assert!(a.id < b.id);

    assert_eq!(job_repo::claim_next(&consumer).unwrap().unwrap().id, a.id);
    assert_eq!(job_repo::claim_next(&consumer).unwrap().unwrap().id, b.id);
    assert!(job_repo::claim_next(&consumer).unwrap().is_none());
}

#[test]
fn test_concurrent_creates_get_distinct_ids() {
    let harness = TestHarness::new();
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|n| {
            let db = harness.database();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                job_repo::create(&db, &format!("job {}", n)).unwrap().id
            })
        })
        .collect();

    let ids: HashSet<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(job_repo::list(&harness.database()).unwrap().len(), 2);
}

#[test]
fn test_concurrent_claimers_never_share_a_job() {
    const JOBS: usize = 40;
    const CLAIMERS: usize = 4;

    let harness = TestHarness::new();
    let producer = harness.database();
    for n in 0..JOBS {
        job_repo::create(&producer, &format!("job {}", n)).unwrap();
    }

    let barrier = Arc::new(Barrier::new(CLAIMERS));
    let handles: Vec<_> = (0..CLAIMERS)
        .map(|_| {
            let db = harness.database();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut claimed = Vec::new();
                while let Some(job) = job_repo::claim_next(&db).unwrap() {
                    assert_eq!(job.status, JobStatus::Processing);
                    claimed.push(job.id);
                }
                claimed
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    let unique: HashSet<i64> = all.iter().copied().collect();
    assert_eq!(all.len(), JOBS);
    assert_eq!(unique.len(), JOBS);
    assert_eq!(
        job_repo::count_by_status(&producer, JobStatus::Processing).unwrap(),
        JOBS as u64
    );
}

#[test]
fn test_orphaned_jobs_fail_when_a_new_worker_starts() {
    let harness = TestHarness::new();
    let producer = harness.database();
    let stuck = job_repo::create(&producer, "interrupted").unwrap();
    let waiting = job_repo::create(&producer, "still queued").unwrap();

    // A previous worker claimed the first job and then died.
    job_repo::claim_next(&harness.database()).unwrap();

    let mut worker = harness.worker(Box::new(ScriptedSynthesizer::new()));
    assert_eq!(worker.fail_orphaned().unwrap(), 1);

    let stuck = job_repo::get(&producer, stuck.id).unwrap().unwrap();
    assert_eq!(stuck.status, JobStatus::Error);
    assert_eq!(stuck.error_message.as_deref(), Some(ORPHANED_JOB_MESSAGE));

    assert_eq!(worker.run_once().unwrap().job_id(), Some(waiting.id));
}

#[test]
fn test_background_worker_picks_up_new_submissions() {
    let harness = TestHarness::new();
    let producer = harness.database();
    let synth = ScriptedSynthesizer::new();
    let spoken = Arc::clone(&synth.spoken);
    let handle = harness.worker(Box::new(synth)).spawn().unwrap();

    // Submitted after the worker is already polling an empty queue.
    thread::sleep(Duration::from_millis(30));
    let first = job_repo::create(&producer, "first").unwrap();
    let second = job_repo::create(&producer, "second").unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while job_repo::count_by_status(&producer, JobStatus::Success).unwrap() < 2 {
        assert!(Instant::now() < deadline, "worker did not process submissions");
        thread::sleep(Duration::from_millis(10));
    }

    handle.shutdown();
    handle.wait();

    assert_eq!(*spoken.lock().unwrap(), vec!["first", "second"]);
    for id in [first.id, second.id] {
        let job = job_repo::get(&producer, id).unwrap().unwrap();
        assert!(harness.public_dir.join(job.audio_path.unwrap()).exists());
    }
}

#[test]
fn test_worker_recovers_from_busy_store() {
    let harness = TestHarness::with_busy_timeout(100);
    let producer = harness.database();
    let lock = StoreLock::new(&harness.db_path);
    let first = job_repo::create(&producer, "first").unwrap();
    let second = job_repo::create(&producer, "second").unwrap();

    let handle = harness.worker(Box::new(lock.synthesizer())).spawn().unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while !lock.is_held() {
        assert!(Instant::now() < deadline, "worker never synthesized");
        thread::sleep(Duration::from_millis(5));
    }

    // Several busy timeouts pass while the lock is held.
    thread::sleep(Duration::from_millis(400));
    assert_eq!(
        job_repo::get(&producer, first.id).unwrap().unwrap().status,
        JobStatus::Processing
    );
    assert_eq!(
        job_repo::get(&producer, second.id).unwrap().unwrap().status,
        JobStatus::Pending
    );

    lock.release();

    while job_repo::count_by_status(&producer, JobStatus::Success).unwrap() < 2 {
        assert!(Instant::now() < deadline, "worker did not recover");
        thread::sleep(Duration::from_millis(10));
    }

    handle.shutdown();
    handle.wait();

    for id in [first.id, second.id] {
        let job = job_repo::get(&producer, id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Success);
        assert!(job.completed_at.unwrap() >= job.started_at.unwrap());
        assert!(harness.public_dir.join(job.audio_path.unwrap()).exists());
    }
    assert_eq!(
        job_repo::count_by_status(&producer, JobStatus::Processing).unwrap(),
        0
    );
}
