//! Queue of pods waiting for a decision in one scheduling simulation.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use crate::core::common::{RESOURCE_CPU, RESOURCE_MEMORY};
use crate::core::pod::Pod;
use crate::scheduling::options::QueueOrder;
use crate::scheduling::pod_data::PodData;

/// Pod with its sort key for the largest-first order.
struct QueuedPod {
    cpu: u64,
    memory: u64,
    /// Position in the input, keeps the order stable for equal requests.
    position: usize,
    pod: Pod,
}

impl Ord for QueuedPod {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cpu
            .cmp(&other.cpu)
            .then(self.memory.cmp(&other.memory))
            .then(other.position.cmp(&self.position))
    }
}

impl PartialOrd for QueuedPod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedPod {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl Eq for QueuedPod {}

pub struct Queue {
    pods: VecDeque<Pod>,
}

impl Queue {
    /// `pod_data` must hold an entry for every pod; requests are taken from it instead of being
    /// recomputed.
    pub fn new(pods: Vec<Pod>, pod_data: &HashMap<String, PodData>, order: QueueOrder) -> Self {
        let pods = match order {
            QueueOrder::Input => pods.into_iter().collect(),
            QueueOrder::LargestFirst => {
                let mut heap: BinaryHeap<QueuedPod> = pods
                    .into_iter()
                    .enumerate()
                    .map(|(position, pod)| {
                        let (cpu, memory) = match pod_data.get(pod.key()) {
                            Some(data) => (
                                data.requests.get(RESOURCE_CPU),
                                data.requests.get(RESOURCE_MEMORY),
                            ),
                            None => (pod.cpu_request(), pod.memory_request()),
                        };
                        QueuedPod {
                            cpu,
                            memory,
                            position,
                            pod,
                        }
                    })
                    .collect();
                let mut sorted = VecDeque::with_capacity(heap.len());
                while let Some(queued) = heap.pop() {
                    sorted.push_back(queued.pod);
                }
                sorted
            }
        };
        Self { pods }
    }

    /// Next pod, `None` once the queue is empty.
    pub fn pop(&mut self) -> Option<Pod> {
        self.pods.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }

    /// Pods which were never popped.
    pub fn into_remaining(self) -> Vec<Pod> {
        self.pods.into_iter().collect()
    }
}
