use std::mem::swap;

use rand::{distributions::{Bernoulli, Distribution}, rngs::StdRng, Rng, SeedableRng};
use slotmap::{new_key_type, Key, SecondaryMap, SlotMap};

use crate::{Error, TraceEvent, Tracer};

new_key_type! {
	struct NodeKey;
}

/// Stable identifier for an element in a [`SkewHeap`], returned by [`SkewHeap::push`]
/// and consumed by [`SkewHeap::decrease_key`].  A handle stays valid until its element
/// is extracted.  Melding invalidates every handle issued by the consumed operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(NodeKey);

#[derive(Debug)]
struct SkewNode<T> {
	item: T,
	left: NodeKey,
	right: NodeKey,
	// back-reference only, never followed for ownership
	parent: NodeKey
}

#[cfg(test)]
#[derive(Debug, PartialEq, Eq)]
enum SkewHeapError {
	HeapOrder,
	BrokenParentLink,
	RootHasParent,
	WrongCount
}

fn emit<T>(tracing: bool, tracer: &mut Option<Tracer<T>>, event: TraceEvent<T>) {
	if tracing {
		if let Some(tracer) = tracer.as_mut() {
			tracer(event)
		}
	}
}

/// A meldable min-heap: a skew heap whose post-meld child swap happens with a
/// configurable probability rather than unconditionally.
/// - Find min: O(1)
/// - Insert / pop min / meld / decrease key: amortized O(log(n)) at flip probability 1
///   (the classical skew heap); expected O(log(n)) for probabilities below 1, trading
///   guaranteed balance for fewer swaps.
/// All mutating operations funnel through a single primitive that merges two right
/// spines like sorted lists and then flips children along the merged path.
/// Elements only need a total order; nothing numeric is assumed.  The randomness
/// source is owned per heap, so seeding the rng makes a heap fully deterministic.
pub struct SkewHeap<T, R: Rng = StdRng> {
	nodes: SlotMap<NodeKey, SkewNode<T>>,
	root: NodeKey,
	flip: Bernoulli,
	flip_probability: f64,
	rng: R,
	comparisons: u64,
	flips: u64,
	tracing: bool,
	tracer: Option<Tracer<T>>
}

impl<T: Ord> SkewHeap<T> {
	/// Create an empty heap with an entropy-seeded rng.
	/// Fails with `Error::BadProbability` unless `flip_probability` is in [0, 1]
	pub fn new(flip_probability: f64) -> Result<Self, Error> {
		Self::with_rng(flip_probability, StdRng::from_entropy())
	}
}

impl<T: Ord> Default for SkewHeap<T> {
	/// The classical skew heap: flip probability 1, entropy-seeded rng
	fn default() -> Self {
		// 1 is always a valid probability
		Self::new(1.0).unwrap()
	}
}

impl<T: Ord, R: Rng> SkewHeap<T, R> {
	/// Create an empty heap drawing its flip decisions from `rng`.
	/// Fails with `Error::BadProbability` unless `flip_probability` is in [0, 1]
	pub fn with_rng(flip_probability: f64, rng: R) -> Result<Self, Error> {
		let flip = Bernoulli::new(flip_probability)
			.map_err(|_|Error::BadProbability(flip_probability))?;
		Ok(Self{
			nodes: SlotMap::with_key(),
			root: NodeKey::null(),
			flip, flip_probability, rng,
			comparisons: 0, flips: 0,
			tracing: false, tracer: None
		})
	}

	/// Get the number of elements in the heap
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.root.is_null()
	}

	/// The flip probability this heap was configured with
	pub fn flip_probability(&self) -> f64 {
		self.flip_probability
	}

	/// Total key comparisons performed by spine merges so far.  Never decreases
	pub fn comparison_count(&self) -> u64 {
		self.comparisons
	}

	/// Total child swaps actually performed by flip passes so far.  Never decreases
	pub fn flip_count(&self) -> u64 {
		self.flips
	}

	/// Attach an observation callback, invoked with a [`TraceEvent`] after each
	/// phase of every mutating operation, and enable tracing
	pub fn set_tracer(&mut self, tracer: impl FnMut(TraceEvent<T>) + 'static) {
		self.tracer = Some(Box::new(tracer));
		self.tracing = true;
	}

	/// Toggle delivery to the attached tracer without detaching it.
	/// While disabled, the only overhead is this flag check
	pub fn set_tracing(&mut self, tracing: bool) {
		self.tracing = tracing;
	}

	/// Get the minimum element without removing it, or `None` if the heap is empty.
	/// No side effects; counters are untouched
	pub fn peek_min(&self) -> Option<&T> {
		self.nodes.get(self.root).map(|node|&node.item)
	}

	/// Insert an element, returning a handle usable with [`SkewHeap::decrease_key`].
	/// Elements that compare equal are fine; extraction order among them follows the
	/// meld tie-break
	pub fn push(&mut self, item: T) -> NodeHandle {
		let key = self.nodes.insert(SkewNode{
			item,
			left: NodeKey::null(),
			right: NodeKey::null(),
			parent: NodeKey::null()
		});
		let root = self.root;
		self.root = self.meld_roots(root, key);
		emit(self.tracing, &mut self.tracer, TraceEvent::Inserted(&self.nodes[key].item));
		NodeHandle(key)
	}

	/// Get the minimum element and remove it, or `None` if the heap is empty
	/// (in which case nothing changes, counters included)
	pub fn pop_min(&mut self) -> Option<T> {
		let node = self.nodes.remove(self.root)?;
		self.root = node.left;
		if let Some(left) = self.nodes.get_mut(node.left) {
			left.parent = NodeKey::null();
		}
		if let Some(right) = self.nodes.get_mut(node.right) {
			right.parent = NodeKey::null();
		}
		if !(self.root.is_null() && node.right.is_null()) {
			let root = self.root;
			self.root = self.meld_roots(root, node.right);
		}
		emit(self.tracing, &mut self.tracer, TraceEvent::Extracted(&node.item));
		Some(node.item)
	}

	/// Move every element of `other` into this heap.  `other` is consumed, so a heap
	/// can never be melded with itself; its counters and rng are discarded and its
	/// handles do not carry over.  Melding with an empty operand preserves the other
	/// operand's elements exactly, though the flip pass may still reshape the tree
	pub fn meld<R2: Rng>(&mut self, mut other: SkewHeap<T, R2>) {
		let mut remap = SecondaryMap::with_capacity(other.nodes.len());
		let mut moved = Vec::with_capacity(other.nodes.len());
		for (old, node) in other.nodes.drain() {
			let new = self.nodes.insert(node);
			remap.insert(old, new);
			moved.push(new);
		}
		for &key in &moved {
			let node = &mut self.nodes[key];
			for link in [&mut node.left, &mut node.right, &mut node.parent] {
				if !link.is_null() {
					*link = remap[*link];
				}
			}
		}
		let other_root = if other.root.is_null() { NodeKey::null() } else { remap[other.root] };
		let root = self.root;
		self.root = self.meld_roots(root, other_root);
	}

	/// Lower the key of the element behind `handle` to `new_item`, keeping the
	/// element's subtree intact, and re-meld it into the heap.
	/// Fails with `Error::ForeignNode` if the handle is stale or not rooted in this
	/// heap, and with `Error::KeyNotDecreased` if `new_item` compares greater than
	/// the current key.  A failing call leaves the heap untouched.
	/// Note the foreign check is best-effort across distinct heap instances: a live
	/// handle minted by another heap can alias one of ours, so passing such a handle
	/// is a caller error this method cannot always detect
	pub fn decrease_key(&mut self, handle: NodeHandle, new_item: T) -> Result<(), Error> {
		let NodeHandle(key) = handle;
		if !self.contains(handle) {
			return Err(Error::ForeignNode)
		}
		if new_item > self.nodes[key].item {
			return Err(Error::KeyNotDecreased)
		}
		if key == self.root {
			// already the minimum's slot, so lowering in place keeps heap order
			// and avoids melding the root with itself
			self.nodes[key].item = new_item;
			emit(self.tracing, &mut self.tracer, TraceEvent::KeyDecreased(&self.nodes[key].item));
			return Ok(())
		}
		let parent_key = self.nodes[key].parent;
		let parent = &mut self.nodes[parent_key];
		if parent.left == key {
			parent.left = NodeKey::null();
		} else {
			parent.right = NodeKey::null();
		}
		let node = &mut self.nodes[key];
		node.parent = NodeKey::null();
		node.item = new_item;
		let root = self.root;
		self.root = self.meld_roots(root, key);
		emit(self.tracing, &mut self.tracer, TraceEvent::KeyDecreased(&self.nodes[key].item));
		Ok(())
	}

	/// Test whether `handle` refers to an element currently rooted in this heap,
	/// by walking parent links up from the element.  O(depth)
	pub fn contains(&self, handle: NodeHandle) -> bool {
		let NodeHandle(mut key) = handle;
		if !self.nodes.contains_key(key) {
			return false
		}
		loop {
			let parent = self.nodes[key].parent;
			if parent.is_null() {
				return key == self.root
			}
			key = parent;
		}
	}

	// The sole tree-mutating primitive.  Merges the right spines of the trees rooted
	// at `a` and `b` like two sorted lists: whichever cursor holds the smaller key is
	// appended to the merged spine and advanced to its right child, with each node's
	// left subtree riding along untouched.  Ties, and an exhausted `b` cursor, favor
	// `a`, so equal keys keep a fixed, reproducible order.  One comparison is counted
	// per appended node.  Heap order is only violated inside this loop
	fn meld_roots(&mut self, a: NodeKey, b: NodeKey) -> NodeKey {
		let mut cur_a = a;
		let mut cur_b = b;
		let mut last = NodeKey::null();
		let mut root = NodeKey::null();
		while !cur_a.is_null() || !cur_b.is_null() {
			self.comparisons += 1;
			let next;
			if cur_b.is_null() || (!cur_a.is_null() && self.nodes[cur_a].item <= self.nodes[cur_b].item) {
				next = cur_a;
				cur_a = self.nodes[next].right;
			} else {
				next = cur_b;
				cur_b = self.nodes[next].right;
			}
			self.nodes[next].parent = last;
			if last.is_null() {
				root = next;
			} else {
				self.nodes[last].right = next;
			}
			last = next;
		}
		emit(self.tracing, &mut self.tracer, TraceEvent::Melded);
		self.flip_pass(last);
		root
	}

	// Walk from the bottom of the merged spine up to the root, swapping each strict
	// ancestor's children with the configured probability.  At probability 1 this is
	// the classical skew heap swap along the whole merge path
	fn flip_pass(&mut self, bottom: NodeKey) {
		if bottom.is_null() {
			return
		}
		let mut cur = self.nodes[bottom].parent;
		while !cur.is_null() {
			if self.flip.sample(&mut self.rng) {
				self.flips += 1;
				let node = &mut self.nodes[cur];
				swap(&mut node.left, &mut node.right);
			}
			cur = self.nodes[cur].parent;
		}
		emit(self.tracing, &mut self.tracer, TraceEvent::Rebalanced{flips: self.flips});
	}

	#[cfg(test)]
	fn check(&self) -> Result<(), SkewHeapError> {
		use SkewHeapError::*;
		#[cfg(feature = "stress_tests")]{
			return Ok(())
		}
		if self.root.is_null() {
			return if self.nodes.is_empty() { Ok(()) } else { Err(WrongCount) }
		}
		if !self.nodes[self.root].parent.is_null() {
			return Err(RootHasParent)
		}
		let mut count = 0;
		let mut stack = vec![self.root];
		while let Some(key) = stack.pop() {
			count += 1;
			if count > self.nodes.len() {
				// more nodes reachable than slots allocated, so some node repeats
				return Err(WrongCount)
			}
			let node = &self.nodes[key];
			for child in [node.left, node.right] {
				if child.is_null() {
					continue
				}
				let child_node = &self.nodes[child];
				if child_node.parent != key {
					return Err(BrokenParentLink)
				}
				if child_node.item < node.item {
					return Err(HeapOrder)
				}
				stack.push(child);
			}
		}
		if count == self.nodes.len() { Ok(()) } else { Err(WrongCount) }
	}
}

impl<T: Ord, R: Rng> Extend<T> for SkewHeap<T, R> {
	fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
		for item in iter {
			self.push(item);
		}
	}
}

impl<T: Ord> FromIterator<T> for SkewHeap<T> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		let mut heap = Self::default();
		heap.extend(iter);
		heap
	}
}
