use rand::{rngs::StdRng, Rng, SeedableRng};

use super::*;
use crate::{test_util::setup_test_tracing, CapacityProfile};

fn factory(capacity: i64, setup_duration: i64) -> JobFactory {
    let setup = TaskSpec::copy_file("/data/english.200Mi", "/tmp/english.200Mi");
    let setup = TaskSpec::new(setup.command().to_vec(), setup_duration).unwrap();
    let profile = CapacityProfile::new(
        capacity,
        vec!["-C".into(), "cstd01".into(), "-p".into(), "short".into()],
        setup,
    )
    .unwrap();
    JobFactory::new(profile)
}

fn tasks(durations: &[i64]) -> Vec<TaskSpec> {
    durations
        .iter()
        .enumerate()
        .map(|(i, d)| TaskSpec::new(vec!["bench".to_string(), format!("task-{i}")], *d).unwrap())
        .collect()
}

fn durations(job: &Job) -> Vec<i64> {
    job.tasks().iter().map(|t| t.estimated_duration()).collect()
}

fn random_durations(rng: &mut StdRng, max: i64) -> Vec<i64> {
    let len = rng.gen_range(0..60);
    (0..len).map(|_| rng.gen_range(0..=max)).collect()
}

#[test]
fn splits_when_task_does_not_fit() {
    setup_test_tracing();
    let schedule = pack(tasks(&[50, 30, 40, 5]), &factory(100, 10));

    assert_eq!(schedule.len(), 2);
    let jobs = schedule.jobs();
    assert_eq!(jobs[0].setup_task().estimated_duration(), 10);
    assert_eq!(durations(&jobs[0]), vec![50, 30]);
    assert_eq!(jobs[0].remaining_capacity(), 10);
    assert_eq!(durations(&jobs[1]), vec![40, 5]);
    assert_eq!(jobs[1].remaining_capacity(), 45);
    assert!(schedule.oversubscribed().is_empty());
}

#[test]
fn oversized_task_gets_its_own_job() {
    setup_test_tracing();
    let schedule = pack(tasks(&[150]), &factory(100, 10));

    assert_eq!(schedule.len(), 1);
    let job = &schedule.jobs()[0];
    assert_eq!(durations(job), vec![150]);
    assert_eq!(job.remaining_capacity(), -60);
    assert_eq!(schedule.oversubscribed(), vec![0]);
}

#[test]
fn oversized_first_task_does_not_leave_setup_only_job() {
    let schedule = pack(tasks(&[150, 20, 30]), &factory(100, 10));

    assert_eq!(schedule.len(), 2);
    assert_eq!(durations(&schedule.jobs()[0]), vec![150]);
    assert_eq!(schedule.jobs()[0].remaining_capacity(), -60);
    assert_eq!(durations(&schedule.jobs()[1]), vec![20, 30]);
    assert_eq!(schedule.jobs()[1].remaining_capacity(), 40);
    assert_eq!(schedule.oversubscribed(), vec![0]);
}

#[test]
fn setup_larger_than_capacity() {
    let schedule = pack(tasks(&[5, 0, 40]), &factory(100, 120));

    // Every job starts over budget, so each one takes exactly one task.
    assert_eq!(schedule.len(), 3);
    for (job, expected) in schedule.iter().zip([5, 0, 40]) {
        assert_eq!(durations(job), vec![expected]);
        assert_eq!(job.remaining_capacity(), 100 - 120 - expected);
    }
    assert_eq!(schedule.oversubscribed(), vec![0, 1, 2]);
}

#[test]
fn setup_larger_than_capacity_with_empty_input() {
    let schedule = pack(Vec::new(), &factory(100, 120));

    assert_eq!(schedule.len(), 1);
    assert!(schedule.jobs()[0].tasks().is_empty());
    assert_eq!(schedule.jobs()[0].remaining_capacity(), -20);
}

#[test]
fn oversized_task_in_the_middle() {
    let schedule = pack(tasks(&[20, 150, 20]), &factory(100, 10));

    assert_eq!(schedule.len(), 3);
    assert_eq!(durations(&schedule.jobs()[0]), vec![20]);
    assert_eq!(durations(&schedule.jobs()[1]), vec![150]);
    assert_eq!(durations(&schedule.jobs()[2]), vec![20]);
    assert_eq!(schedule.oversubscribed(), vec![1]);
}

#[test]
fn empty_input_yields_setup_only_job() {
    let schedule = pack(Vec::new(), &factory(100, 10));

    assert_eq!(schedule.len(), 1);
    assert!(!schedule.is_empty());
    let job = &schedule.jobs()[0];
    assert!(job.tasks().is_empty());
    assert_eq!(job.all_tasks().len(), 1);
    assert_eq!(job.remaining_capacity(), 90);
    assert_eq!(
        job.render(),
        vec!["cp /data/english.200Mi /tmp/english.200Mi"]
    );
}

#[test]
fn exact_fit_stays_in_job() {
    let schedule = pack(tasks(&[45, 45, 1]), &factory(100, 10));

    assert_eq!(schedule.len(), 2);
    assert_eq!(durations(&schedule.jobs()[0]), vec![45, 45]);
    assert_eq!(schedule.jobs()[0].remaining_capacity(), 0);
}

#[test]
fn does_not_backfill_sealed_jobs() {
    // Next-fit: the 5 would fit into the first job, but that job is already sealed.
    let schedule = pack(tasks(&[60, 50, 5]), &factory(100, 10));

    assert_eq!(schedule.len(), 2);
    assert_eq!(durations(&schedule.jobs()[0]), vec![60]);
    assert_eq!(durations(&schedule.jobs()[1]), vec![50, 5]);
}

#[test]
fn zero_duration_tasks_never_split() {
    let schedule = pack(tasks(&[90, 0, 0, 0]), &factory(100, 10));
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule.jobs()[0].tasks().len(), 4);
}

#[test]
fn packer_streams_like_pack() {
    let factory = factory(100, 10);
    let input = tasks(&[10, 80, 30, 70, 5, 5]);

    let mut packer = Packer::new(&factory);
    for task in input.clone() {
        packer.push(task);
    }

    assert_eq!(packer.finish(), pack(input, &factory));
}

#[test]
fn summary() {
    let schedule = pack(tasks(&[50, 30, 40, 5, 150]), &factory(100, 10));
    let summary = schedule.summary();

    assert_eq!(
        summary,
        ScheduleSummary {
            num_jobs: 3,
            num_tasks: 5,
            estimated_duration: 275 + 30,
            num_oversubscribed: 1,
        }
    );
    assert_eq!(
        summary.to_string(),
        "5 tasks in 3 jobs, 305s estimated, 1 oversubscribed"
    );
}

#[test]
fn preserves_every_task_in_order() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..200 {
        let input = tasks(&random_durations(&mut rng, 120));
        let schedule = pack(input.clone(), &factory(100, 10));

        assert!(!schedule.is_empty());
        let packed = schedule.input_tasks().cloned().collect::<Vec<_>>();
        assert_eq!(packed, input);

        if !input.is_empty() {
            for job in &schedule {
                assert!(!job.tasks().is_empty(), "setup-only job in {schedule:?}");
            }
        }
    }
}

#[test]
fn capacity_only_negative_for_single_oversized_task() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let input = tasks(&random_durations(&mut rng, 120));
        let non_empty = !input.is_empty();
        let schedule = pack(input, &factory(100, 10));

        for job in &schedule {
            if non_empty {
                assert!(!job.tasks().is_empty(), "setup-only job in {schedule:?}");
            }

            if job.is_oversubscribed() {
                assert_eq!(job.tasks().len(), 1, "{job:?}");
                assert!(job.tasks()[0].estimated_duration() > 90);
            }

            let used: i64 = job.all_tasks().iter().map(|t| t.estimated_duration()).sum();
            assert_eq!(job.remaining_capacity(), 100 - used);
        }
    }
}

#[test]
fn packing_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    let factory = factory(300, 25);
    for _ in 0..50 {
        let input = tasks(&random_durations(&mut rng, 200));
        assert_eq!(pack(input.clone(), &factory), pack(input, &factory));
    }
}

#[test]
fn every_job_starts_with_setup() {
    let factory = factory(100, 10);
    let schedule = pack(tasks(&[70, 70, 70]), &factory);

    assert_eq!(schedule.len(), 3);
    for job in &schedule {
        assert_eq!(job.setup_task(), factory.profile().setup_task());
        assert_eq!(job.remaining_capacity(), 20);
    }
}
